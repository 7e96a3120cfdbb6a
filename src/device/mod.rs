//! A physical or logical network link driving a class of Services.

pub mod capability;
mod state;

use bitflags::bitflags;

pub use capability::Capability;
pub use state::DeviceState;

use crate::{
    common::Property,
    core::Result,
    ids::ServiceId,
    property_store::{PropertyStore, ValueKind},
    store::Value,
    technology::Technology,
};

bitflags! {
    /// Kernel netlink link flags, as delivered by a `LinkEvent`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LinkFlags: u32 {
        /// The administrative state is up.
        const UP = 0b001;
        /// The interface is operationally running.
        const RUNNING = 0b010;
        /// The lower (physical) layer reports carrier.
        const LOWER_UP = 0b100;
    }
}

/// A physical/logical network interface.
///
/// External observers see only a [`Technology`] tag and a `running`
/// flag; the richer per-technology state machine
/// ([`state::DeviceState`]) is private to this type.
pub struct Device {
    link_name: Property<String>,
    interface_index: Property<i32>,
    mac_address: String,
    technology: Technology,

    device_state: DeviceState,
    running: Property<bool>,
    link_up: Property<bool>,
    selected_service: Option<ServiceId>,

    capability: Box<dyn Capability>,
    property_store: PropertyStore,
}

fn build_property_store(
    link_name: &Property<String>,
    interface_index: &Property<i32>,
    mac_address: &str,
    running: &Property<bool>,
    link_up: &Property<bool>,
) -> PropertyStore {
    let mut store = PropertyStore::new();
    store.bind_string("Interface", link_name, true);
    let get_interface_index = interface_index.clone();
    store.register_read_only("InterfaceIndex", ValueKind::Int, move || {
        Value::Int(get_interface_index.get())
    });
    let mac_address = mac_address.to_string();
    store.register_read_only("Address", ValueKind::String, move || Value::String(mac_address.clone()));
    store.bind_bool("Powered", running, true);
    store.bind_bool("LinkUp", link_up, true);
    store
}

impl Device {
    /// Creates a new, disabled Device with the given identity and a
    /// default capability for `technology`.
    #[must_use]
    pub fn new(
        link_name: impl Into<String>,
        interface_index: i32,
        mac_address: impl Into<String>,
        technology: Technology,
    ) -> Self {
        Self::with_capability(
            link_name,
            interface_index,
            mac_address,
            technology,
            capability::default_capability(technology),
        )
    }

    /// As [`Device::new`], but with a caller-supplied capability (used by
    /// tests and by [`crate::modem_manager_watcher`] to inject a specific
    /// cellular binding).
    #[must_use]
    pub fn with_capability(
        link_name: impl Into<String>,
        interface_index: i32,
        mac_address: impl Into<String>,
        technology: Technology,
        capability: Box<dyn Capability>,
    ) -> Self {
        let link_name = Property::new(link_name.into());
        let interface_index = Property::new(interface_index);
        let mac_address = mac_address.into();
        let running = Property::new(false);
        let link_up = Property::new(false);
        let property_store = build_property_store(&link_name, &interface_index, &mac_address, &running, &link_up);

        Self {
            link_name,
            interface_index,
            mac_address,
            technology,
            device_state: DeviceState::Disabled,
            running,
            link_up,
            selected_service: None,
            capability,
            property_store,
        }
    }

    /// The kernel interface name (e.g. `"wlan0"`).
    #[must_use]
    pub fn link_name(&self) -> String {
        self.link_name.get()
    }

    /// The kernel interface index.
    #[must_use]
    pub fn interface_index(&self) -> i32 {
        self.interface_index.get()
    }

    /// The hardware (MAC) address.
    #[must_use]
    pub fn mac_address(&self) -> &str {
        &self.mac_address
    }

    /// This Device's technology.
    #[must_use]
    pub fn technology(&self) -> Technology {
        self.technology
    }

    /// This Device's bus-facing property table.
    #[must_use]
    pub fn property_store(&self) -> &PropertyStore {
        &self.property_store
    }

    /// Records the kernel link identity once it becomes available, e.g.
    /// when a cellular Device created before its netlink interface
    /// appeared is later correlated with one.
    pub fn set_link_info(&mut self, link_name: impl Into<String>, interface_index: i32) {
        self.link_name.set(link_name.into());
        self.interface_index.set(interface_index);
    }

    /// Returns `true` if `tag` matches this Device's technology.
    #[must_use]
    pub fn technology_is(&self, tag: Technology) -> bool {
        self.technology == tag
    }

    /// Whether the Device is powered on and driven by the daemon.
    #[must_use]
    pub fn running(&self) -> bool {
        self.running.get()
    }

    /// Whether the kernel reports the link as up.
    #[must_use]
    pub fn link_up(&self) -> bool {
        self.link_up.get()
    }

    /// The currently selected Service, if any.
    #[must_use]
    pub fn selected_service(&self) -> Option<ServiceId> {
        self.selected_service
    }

    /// Powers on this Device.
    ///
    /// # Errors
    /// Returns an error if the underlying capability rejects activation.
    pub fn start(&mut self) -> Result<()> {
        self.capability.start()?;
        self.device_state = DeviceState::Enabled;
        self.running.set(true);
        Ok(())
    }

    /// Powers off this Device, dropping any selected Service.
    ///
    /// # Errors
    /// Returns an error if the underlying capability rejects teardown.
    pub fn stop(&mut self) -> Result<()> {
        self.capability.stop()?;
        self.device_state = DeviceState::Disabled;
        self.selected_service = None;
        self.running.set(false);
        Ok(())
    }

    /// Begins bringing up `service` as this Device's selected Service.
    ///
    /// # Errors
    /// Returns an error if the underlying capability rejects the
    /// attempt.
    pub fn connect(&mut self, service: ServiceId) -> Result<()> {
        self.capability.connect(service)?;
        self.selected_service = Some(service);
        if self.device_state != DeviceState::Disabled {
            self.device_state = DeviceState::Connected;
        }
        Ok(())
    }

    /// Tears down the currently selected Service.
    ///
    /// # Errors
    /// Returns an error if the underlying capability rejects teardown.
    pub fn disconnect(&mut self, service: ServiceId) -> Result<()> {
        if self.selected_service == Some(service) {
            self.capability.disconnect()?;
            self.selected_service = None;
            if self.device_state == DeviceState::Connected {
                self.device_state = DeviceState::Enabled;
            }
        }
        Ok(())
    }

    /// Requests a Service scan (Wi-Fi, cellular); a no-op otherwise.
    ///
    /// # Errors
    /// Returns an error if the underlying capability rejects the scan
    /// request.
    pub fn scan(&mut self) -> Result<()> {
        self.capability.scan()
    }

    /// Updates link state from a kernel netlink link event.
    ///
    /// `flags` is the link's current flag set; `changed` is the subset
    /// that differs from the previous event. Returns `true` if
    /// `link_up` changed, so the caller (normally
    /// [`crate::manager::Manager`]) knows to re-run policy.
    pub fn link_event(&mut self, flags: LinkFlags, changed: LinkFlags) -> bool {
        if !changed.intersects(LinkFlags::UP | LinkFlags::RUNNING | LinkFlags::LOWER_UP) {
            return false;
        }
        let up = flags.contains(LinkFlags::UP) && flags.contains(LinkFlags::RUNNING);
        self.link_up.set(up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> Device {
        Device::new("wlan0", 3, "aa:bb:cc:dd:ee:ff", Technology::Wifi)
    }

    #[test]
    fn start_sets_running() {
        let mut device = device();
        assert!(!device.running());
        device.start().unwrap();
        assert!(device.running());
    }

    #[test]
    fn connect_then_disconnect_clears_selected_service() {
        let mut device = device();
        device.start().unwrap();
        device.connect(42).unwrap();
        assert_eq!(device.selected_service(), Some(42));
        device.disconnect(42).unwrap();
        assert_eq!(device.selected_service(), None);
    }

    #[test]
    fn disconnect_of_a_non_selected_service_is_a_noop() {
        let mut device = device();
        device.start().unwrap();
        device.connect(1).unwrap();
        device.disconnect(99).unwrap();
        assert_eq!(device.selected_service(), Some(1));
    }

    #[test]
    fn stop_clears_selected_service_and_running() {
        let mut device = device();
        device.start().unwrap();
        device.connect(1).unwrap();
        device.stop().unwrap();
        assert!(!device.running());
        assert_eq!(device.selected_service(), None);
    }

    #[test]
    fn link_event_updates_link_up_only_on_relevant_flag_changes() {
        let mut device = device();
        let changed = device.link_event(LinkFlags::UP | LinkFlags::RUNNING, LinkFlags::UP);
        assert!(changed);
        assert!(device.link_up());

        let unchanged = device.link_event(LinkFlags::UP | LinkFlags::RUNNING, LinkFlags::empty());
        assert!(!unchanged);
    }

    #[test]
    fn property_store_reflects_link_info_and_power_state() {
        use crate::store::Value;

        let mut device = device();
        assert_eq!(device.property_store().get("Interface").unwrap(), Value::String("wlan0".to_string()));
        assert_eq!(device.property_store().get("Powered").unwrap(), Value::Bool(false));

        device.start().unwrap();
        device.set_link_info("wlan1", 4);

        assert_eq!(device.property_store().get("Interface").unwrap(), Value::String("wlan1".to_string()));
        assert_eq!(device.property_store().get("InterfaceIndex").unwrap(), Value::Int(4));
        assert_eq!(device.property_store().get("Powered").unwrap(), Value::Bool(true));
    }
}
