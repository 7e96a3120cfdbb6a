//! Device-internal link/registration state, hidden behind the
//! `running`/`link_up` surface external observers see.

/// A Device's internal lifecycle state.
///
/// Cellular Devices use the full four-state chain (registration with the
/// carrier network is a distinct step from link-up); Ethernet and Wi-Fi
/// collapse `Enabled`/`Registered` into a single "up" notion, since there
/// is no carrier registration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Powered off / not driven by the daemon.
    Disabled,
    /// Powered on, not yet link-up (cellular: not yet registered).
    Enabled,
    /// Cellular only: registered with a carrier network.
    Registered,
    /// A Service is selected and connected through this Device.
    Connected,
}

impl DeviceState {
    /// Returns `true` if this state corresponds to the externally
    /// visible `running` flag.
    #[must_use]
    pub fn is_running(self) -> bool {
        !matches!(self, DeviceState::Disabled)
    }
}
