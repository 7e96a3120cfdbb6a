//! Per-technology bring-up behavior, composed into a [`super::Device`]
//! instead of expressed through a class hierarchy.

use crate::{core::Result, ids::ServiceId, technology::Technology};

/// The narrow behavior set a technology-specific driver binding must
/// implement. A [`super::Device`] holds exactly one of these, selected by
/// its [`Technology`] tag at construction.
///
/// Every method here is expected to talk to an external driver daemon
/// through a proxy obtained from [`crate::proxy_factory::ProxyFactory`];
/// that wiring is out of scope for this crate; the stub implementations
/// in this module exercise the call sequence without a peer on the other
/// end.
pub trait Capability: Send + Sync {
    /// This capability's technology tag.
    fn technology(&self) -> Technology;

    /// Powers on the underlying hardware/driver binding.
    ///
    /// # Errors
    /// Returns an error if the driver rejects activation.
    fn start(&mut self) -> Result<()>;

    /// Powers off the underlying hardware/driver binding.
    ///
    /// # Errors
    /// Returns an error if teardown fails.
    fn stop(&mut self) -> Result<()>;

    /// Begins bringing up `service` as this Device's selected Service.
    ///
    /// # Errors
    /// Returns an error if the driver rejects the attempt.
    fn connect(&mut self, service: ServiceId) -> Result<()>;

    /// Tears down the currently selected Service.
    ///
    /// # Errors
    /// Returns an error if teardown fails.
    fn disconnect(&mut self) -> Result<()>;

    /// Requests a scan for new Services (only meaningful for Wi-Fi and
    /// cellular); a no-op for technologies without a discovery step.
    ///
    /// # Errors
    /// Returns an error if the driver rejects the scan request.
    fn scan(&mut self) -> Result<()> {
        Ok(())
    }
}

macro_rules! stub_capability {
    ($name:ident, $technology:expr) => {
        /// A minimal
        #[doc = stringify!($technology)]
        /// capability: tracks the call sequence without a real driver peer.
        #[derive(Debug, Default)]
        pub struct $name {
            started: bool,
            selected: Option<ServiceId>,
        }

        impl $name {
            /// Creates a new, stopped capability.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }
        }

        impl Capability for $name {
            fn technology(&self) -> Technology {
                $technology
            }

            fn start(&mut self) -> Result<()> {
                self.started = true;
                Ok(())
            }

            fn stop(&mut self) -> Result<()> {
                self.started = false;
                self.selected = None;
                Ok(())
            }

            fn connect(&mut self, service: ServiceId) -> Result<()> {
                self.selected = Some(service);
                Ok(())
            }

            fn disconnect(&mut self) -> Result<()> {
                self.selected = None;
                Ok(())
            }
        }
    };
}

stub_capability!(EthernetCapability, Technology::Ethernet);
stub_capability!(WifiCapability, Technology::Wifi);
stub_capability!(CellularCapability, Technology::Cellular);
stub_capability!(WimaxCapability, Technology::Wimax);
stub_capability!(VpnCapability, Technology::Vpn);

impl WifiCapability {
    /// Wi-Fi additionally supports scanning for nearby access points.
    pub fn request_scan(&mut self) -> Result<()> {
        self.scan()
    }
}

/// Builds the default capability for `technology`.
#[must_use]
pub fn default_capability(technology: Technology) -> Box<dyn Capability> {
    match technology {
        Technology::Ethernet => Box::new(EthernetCapability::new()),
        Technology::Wifi => Box::new(WifiCapability::new()),
        Technology::Cellular => Box::new(CellularCapability::new()),
        Technology::Wimax => Box::new(WimaxCapability::new()),
        Technology::Vpn => Box::new(VpnCapability::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_tracks_selected_service() {
        let mut cap = EthernetCapability::new();
        cap.start().unwrap();
        cap.connect(7).unwrap();
        assert_eq!(cap.selected, Some(7));
        cap.disconnect().unwrap();
        assert_eq!(cap.selected, None);
    }

    #[test]
    fn default_capability_matches_technology() {
        assert_eq!(default_capability(Technology::Wifi).technology(), Technology::Wifi);
        assert_eq!(default_capability(Technology::Cellular).technology(), Technology::Cellular);
    }
}
