//! Raw `zbus` proxy definitions the [`super::DbusProxyFactory`] wraps.
//!
//! These mirror the pack's own `network_manager::proxy::devices` style: one
//! `#[proxy]` trait per remote interface, with only the members this crate
//! actually calls.

use zbus::proxy;

/// `org.freedesktop.ModemManager1.Modem`.
#[proxy(
    default_service = "org.freedesktop.ModemManager1",
    interface = "org.freedesktop.ModemManager1.Modem"
)]
pub trait Modem {
    /// The equipment identifier (IMEI, MEID or ESN) of the modem.
    #[zbus(property)]
    fn equipment_identifier(&self) -> zbus::Result<String>;

    /// Index of the bearer this modem is currently using, if any.
    #[zbus(property)]
    fn primary_sim_slot(&self) -> zbus::Result<u32>;

    /// Brings the modem fully functional; powers up the radio.
    fn enable(&self, enable: bool) -> zbus::Result<()>;
}

/// `fi.w1.wpa_supplicant1`, the supplicant's root process object.
#[proxy(
    default_service = "fi.w1.wpa_supplicant1",
    default_path = "/fi/w1/wpa_supplicant1",
    interface = "fi.w1.wpa_supplicant1"
)]
pub trait SupplicantProcess {
    /// Registers a network interface with the supplicant, returning its
    /// object path.
    fn create_interface(
        &self,
        args: std::collections::HashMap<String, zbus::zvariant::Value<'_>>,
    ) -> zbus::Result<zbus::zvariant::OwnedObjectPath>;

    /// Unregisters a previously created interface.
    fn remove_interface(&self, path: &zbus::zvariant::ObjectPath<'_>) -> zbus::Result<()>;
}

/// shill's own DHCP client control interface, implemented by `dhcpcd`'s
/// D-Bus shim in the real system; modelled here at the same shape.
#[proxy(interface = "org.chromium.dhcpcd")]
pub trait Dhcp {
    /// Requests the client (re)acquire a lease on the named interface.
    fn rebind(&self, interface: &str) -> zbus::Result<()>;

    /// Releases any held lease on the named interface.
    fn release(&self, interface: &str) -> zbus::Result<()>;
}

/// `org.chromium.PowerManager`, the suspend/resume broker.
#[proxy(
    default_service = "org.chromium.PowerManager",
    default_path = "/org/chromium/PowerManager",
    interface = "org.chromium.PowerManager"
)]
pub trait PowerManager {
    /// Registers for suspend-imminent/dark-resume notifications under
    /// `description`, returning an opaque delay-registration handle.
    fn register_suspend_delay(&self, description: &str) -> zbus::Result<u32>;

    /// Acknowledges a previously notified suspend, with `suspend_id`
    /// matching the notification.
    fn handle_suspend_readiness(&self, delay_id: u32, suspend_id: i32) -> zbus::Result<()>;
}

/// `org.chromium.WiMaxManager`.
#[proxy(
    default_service = "org.chromium.WiMaxManager",
    default_path = "/org/chromium/WiMaxManager",
    interface = "org.chromium.WiMaxManager"
)]
pub trait WiMaxManager {
    /// Object paths of every WiMAX device currently known to the manager.
    #[zbus(property)]
    fn devices(&self) -> zbus::Result<Vec<zbus::zvariant::OwnedObjectPath>>;
}
