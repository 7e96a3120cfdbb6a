//! Service connection state and failure taxonomy.

/// Where a Service is in its connection lifecycle.
///
/// Ranked for [`crate::manager::Manager`]'s best-service selection:
/// higher [`State::rank`] wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not attempting to connect.
    Idle,
    /// Link-layer association is in progress.
    Associating,
    /// Associated; IP configuration (DHCP, etc.) is in progress.
    Configuring,
    /// IP-configured, but not yet portal-checked.
    Connected,
    /// Portal-checked and confirmed to have general internet access.
    Online,
    /// Portal-checked and found behind a captive portal.
    Portal,
    /// The connection attempt failed; see the Service's failure reason.
    Failure,
    /// Explicitly torn down.
    Disconnected,
    /// Initial/unobserved state.
    Unknown,
}

impl State {
    /// Returns this state's rank for best-service comparison: higher
    /// ranks are preferred. States outside the ordered chain
    /// (`Failure`, `Disconnected`, `Unknown`, `Portal`) rank below every
    /// state in the connect path.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            State::Online => 5,
            State::Connected => 4,
            State::Configuring => 3,
            State::Associating => 2,
            State::Idle => 1,
            State::Portal | State::Failure | State::Disconnected | State::Unknown => 0,
        }
    }

    /// Returns `true` if this state represents a live, IP-configured
    /// connection (`Connected`, `Online`, or `Portal`).
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, State::Connected | State::Online | State::Portal)
    }
}

/// Why a Service's last connection attempt failed.
///
/// Modeled after shill's own `Service::ConnectFailure` taxonomy; kept
/// closed rather than a free-form string so callers can match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// No specific reason is known.
    Unknown,
    /// AAA (RADIUS/EAP back-end) authentication failed.
    AaaFailed,
    /// Cellular activation failed.
    ActivationFailure,
    /// A supplied passphrase was rejected.
    BadPassphrase,
    /// A supplied WEP key was rejected.
    BadWepKey,
    /// The connection attempt failed for an unclassified link-layer reason.
    ConnectionFailed,
    /// DHCP failed to provide a lease.
    DhcpFailure,
    /// DNS resolution failed during IP configuration.
    DnsLookupFailed,
    /// 802.1X EAP authentication failed.
    EapAuthentication,
    /// The local TLS stack rejected the EAP handshake.
    EapLocalTls,
    /// The remote TLS stack rejected the EAP handshake.
    EapRemoteTls,
    /// No signal/network in range.
    OutOfRange,
    /// A SIM PIN is required.
    PinMissing,
    /// The SIM is PIN-locked.
    SimLocked,
    /// The SIM is carrier-locked.
    SimCarrierLocked,
    /// An internal fault, not attributable to the remote end.
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_orders_the_connect_path() {
        assert!(State::Online.rank() > State::Connected.rank());
        assert!(State::Connected.rank() > State::Configuring.rank());
        assert!(State::Configuring.rank() > State::Associating.rank());
        assert!(State::Associating.rank() > State::Idle.rank());
        assert_eq!(State::Failure.rank(), State::Disconnected.rank());
    }

    #[test]
    fn is_connected_covers_online_connected_and_portal() {
        assert!(State::Online.is_connected());
        assert!(State::Connected.is_connected());
        assert!(State::Portal.is_connected());
        assert!(!State::Idle.is_connected());
        assert!(!State::Failure.is_connected());
    }
}
