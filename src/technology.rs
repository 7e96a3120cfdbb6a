//! The technology tag shared by every [`crate::device::Device`] and
//! [`crate::service::Service`].

use std::fmt;

/// A network technology. Devices and Services are tagged with one of
/// these instead of being implemented as per-technology subclasses; a
/// [`crate::device::Capability`]/[`crate::service::Capability`]
/// implementation supplies the technology-specific behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Technology {
    /// Wired Ethernet.
    Ethernet,
    /// 802.11 Wi-Fi.
    Wifi,
    /// A cellular modem (3G/4G/5G).
    Cellular,
    /// WiMAX.
    Wimax,
    /// A VPN tunnel layered over another technology.
    Vpn,
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Technology::Ethernet => "ethernet",
            Technology::Wifi => "wifi",
            Technology::Cellular => "cellular",
            Technology::Wimax => "wimax",
            Technology::Vpn => "vpn",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Technology {
    type Err = crate::core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ethernet" => Ok(Technology::Ethernet),
            "wifi" => Ok(Technology::Wifi),
            "cellular" => Ok(Technology::Cellular),
            "wimax" => Ok(Technology::Wimax),
            "vpn" => Ok(Technology::Vpn),
            other => Err(crate::core::Error::InvalidArguments(format!("unknown technology {other:?}"))),
        }
    }
}

/// The compile-time default technology priority order, used when
/// `--default-technology-order` is absent or malformed.
pub const DEFAULT_TECHNOLOGY_ORDER: [Technology; 5] = [
    Technology::Vpn,
    Technology::Ethernet,
    Technology::Wifi,
    Technology::Wimax,
    Technology::Cellular,
];
