//! Cellular-only Service state: activation, roaming, and carrier payment
//! portal details.

/// Cellular activation state of the currently selected SIM/account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationState {
    /// No activation has been requested.
    #[default]
    NotActivated,
    /// OTASP/OTAPA activation is underway.
    Activating,
    /// Activated for voice or data but not both.
    PartiallyActivated,
    /// Fully activated.
    Activated,
}

/// Roaming status as reported by the modem's registration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoamingState {
    /// Not yet known.
    #[default]
    Unknown,
    /// Registered with the home carrier.
    Home,
    /// Registered with a roaming partner.
    Roaming,
}

/// The carrier's online-payment portal, used to complete activation or
/// top up a prepaid balance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnlinePaymentPortal {
    /// Portal URL.
    pub url: String,
    /// HTTP method the portal expects (`"GET"` or `"POST"`).
    pub method: String,
    /// Method-specific POST data, if any.
    pub post_data: String,
}

/// Cellular-only fields of a [`super::Service`].
#[derive(Debug, Clone, Default)]
pub struct CellularExtra {
    /// Current activation state.
    pub activation_state: ActivationState,
    /// Whether OTASP/OTAPA activation has just been kicked off; distinct
    /// from `activation_state` since the modem may not have reported a
    /// state transition yet.
    pub activation_starting: bool,
    /// The registered network's radio technology (e.g. `"LTE"`).
    pub network_technology: String,
    /// Roaming status.
    pub roaming_state: RoamingState,
    /// The carrier's online payment/activation portal, if advertised.
    pub olp: Option<OnlinePaymentPortal>,
    /// The APN currently in use.
    pub apn: Option<String>,
    /// The last APN that successfully connected.
    pub last_good_apn: Option<String>,
    /// Whether this cellular Service may be activated while connected
    /// over a different (e.g. Wi-Fi) network.
    pub activate_over_non_cellular_network: bool,
}

impl CellularExtra {
    /// Returns `true` if this Service's cellular state blocks a new
    /// connection attempt: not activated, mid-activation, or
    /// out-of-credits detection in progress (the latter is tracked by
    /// [`super::out_of_credits::OutOfCreditsDetector`] and checked
    /// separately by the caller).
    #[must_use]
    pub fn blocks_auto_connect(&self) -> bool {
        self.activation_starting || self.activation_state == ActivationState::Activating
    }

    /// Returns `true` if the Service is connectable from a cellular
    /// activation standpoint (not `NotActivated`).
    #[must_use]
    pub fn is_activated_enough_to_connect(&self) -> bool {
        self.activation_state != ActivationState::NotActivated
    }
}
