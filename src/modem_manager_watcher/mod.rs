//! Tracks presence of a ModemManager bus service and the cellular Devices
//! it offers.
//!
//! One watcher exists per watched service name (the classic
//! `org.freedesktop.ModemManager` and/or the v1
//! `org.freedesktop.ModemManager1`, which a deployment may run side by
//! side during a migration). A watcher owns no bus-watch machinery
//! itself; its `on_appear`/`on_vanish` methods are driven by whatever
//! name-owner-changed signal handling the daemon wires up, matching
//! `original_source/modem_manager.h`'s `ModemManager::OnAppear`/`OnVanish`
//! split between the bus-watch plumbing and the state transition.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    core::Result,
    device::Device,
    ids::DeviceId,
    manager::Manager,
    proxy_factory::ProxyFactory,
    technology::Technology,
};

/// Which ModemManager API a watcher enumerates modems through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// The legacy per-method enumeration API.
    Classic,
    /// The object-manager-based API (`org.freedesktop.ModemManager1`).
    V1,
}

/// Whether the watched service is currently owned on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherState {
    /// No owner currently holds the watched service name.
    Absent,
    /// `owner` currently holds the watched service name.
    Present {
        /// The unique bus name of the current owner.
        owner: String,
    },
}

/// Enumerates modem object paths exposed by a ModemManager instance.
///
/// Classic enumerates via a single method call; v1 enumerates via the
/// object manager's `GetManagedObjects` reply. Both are represented the
/// same way here since this crate only needs the resulting path list, not
/// the incremental `InterfacesAdded`/`InterfacesRemoved` machinery v1 uses
/// to keep it current (`on_interfaces_added`/`on_interfaces_removed` below
/// handle that half directly).
#[async_trait]
pub trait ModemEnumerator: Send + Sync {
    /// Lists every modem object path currently known to the service.
    async fn enumerate_modems(&self) -> Result<Vec<String>>;
}

/// Tracks one watched ModemManager service name and the cellular Devices
/// registered on its behalf.
pub struct ModemManagerWatcher {
    service_name: String,
    api_version: ApiVersion,
    state: WatcherState,
    modems: HashMap<String, DeviceId>,
}

impl ModemManagerWatcher {
    /// Creates a watcher for `service_name`, initially absent.
    #[must_use]
    pub fn new(service_name: impl Into<String>, api_version: ApiVersion) -> Self {
        Self { service_name: service_name.into(), api_version, state: WatcherState::Absent, modems: HashMap::new() }
    }

    /// The bus service name this watcher tracks.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Which enumeration API this watcher expects.
    #[must_use]
    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Current presence state.
    #[must_use]
    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    /// Whether the watched service is currently owned.
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self.state, WatcherState::Present { .. })
    }

    /// Whether `path` already has a registered Device.
    #[must_use]
    pub fn modem_exists(&self, path: &str) -> bool {
        self.modems.contains_key(path)
    }

    /// The Device registered for `path`, if any.
    #[must_use]
    pub fn device_for(&self, path: &str) -> Option<DeviceId> {
        self.modems.get(path).copied()
    }

    /// The service took ownership under `owner`: connects, enumerates
    /// every modem the service currently exposes, and registers a
    /// cellular Device with `manager` for each.
    ///
    /// # Errors
    /// Returns an error if enumeration or any per-modem proxy call fails.
    pub async fn on_appear(
        &mut self,
        owner: &str,
        enumerator: &dyn ModemEnumerator,
        proxy_factory: &dyn ProxyFactory,
        manager: &mut Manager,
    ) -> Result<()> {
        self.state = WatcherState::Present { owner: owner.to_string() };

        let paths = enumerator.enumerate_modems().await?;
        for path in paths {
            self.add_modem(path, proxy_factory, manager).await?;
        }
        Ok(())
    }

    /// Registers a single newly enumerated (or `InterfacesAdded`-notified)
    /// modem, if it is not already known.
    ///
    /// # Errors
    /// Returns an error if the modem proxy cannot be built or queried.
    pub async fn add_modem(
        &mut self,
        path: String,
        proxy_factory: &dyn ProxyFactory,
        manager: &mut Manager,
    ) -> Result<()> {
        if self.modem_exists(&path) {
            return Ok(());
        }

        let modem_proxy = proxy_factory.create_modem_proxy(&path).await?;
        let equipment_identifier = modem_proxy.equipment_identifier().await?;

        // The kernel link name is not yet known; `OnDeviceInfoAvailable`
        // fills it in once the interface node appears.
        let device = Device::new(String::new(), -1, equipment_identifier, Technology::Cellular);
        let device_id = manager.add_device(device);
        self.modems.insert(path, device_id);
        Ok(())
    }

    /// `OnInterfacesRemovedSignal`'s per-modem half: drops the Device
    /// registered for `path`, if any.
    pub fn remove_modem(&mut self, path: &str, manager: &mut Manager) {
        if let Some(device_id) = self.modems.remove(path) {
            manager.remove_device(device_id);
        }
    }

    /// The service vanished from the bus: destroys every modem instance
    /// (and, transitively, its Service) and returns to `Absent`.
    pub fn on_vanish(&mut self, manager: &mut Manager) {
        self.state = WatcherState::Absent;
        for (_, device_id) in self.modems.drain() {
            manager.remove_device(device_id);
        }
    }

    /// The kernel has exposed the network interface backing a
    /// previously-enumerated modem: records its link name and interface
    /// index on the Device `add_modem` registered with a placeholder
    /// identity.
    ///
    /// This crate does not run a netlink link-name-to-modem correlation
    /// pass; callers that need one supply `path` directly (the full
    /// daemon derives it from the modem's `Device` D-Bus property).
    pub fn on_device_info_available(
        &mut self,
        path: &str,
        link_name: &str,
        interface_index: i32,
        manager: &mut Manager,
    ) {
        if let Some(device_id) = self.device_for(path) {
            tracing::debug!(path, link_name, interface_index, "kernel link now available for modem");
            if let Some(device) = manager.device_mut(device_id) {
                device.set_link_info(link_name, interface_index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dispatcher::EventDispatcher,
        portal_detector::{ProbeOutcome, Prober},
        proxy_factory::mock::MockProxyFactory,
    };

    struct NeverRespondProber;

    #[async_trait]
    impl Prober for NeverRespondProber {
        async fn probe(&self, _url: &str) -> ProbeOutcome {
            ProbeOutcome::DnsFailure
        }
    }

    struct FixedEnumerator(Vec<String>);

    #[async_trait]
    impl ModemEnumerator for FixedEnumerator {
        async fn enumerate_modems(&self) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    fn manager() -> Manager {
        Manager::new(Arc::new(NeverRespondProber), EventDispatcher::new())
    }

    #[tokio::test]
    async fn on_appear_registers_a_device_per_enumerated_modem() {
        let mut watcher = ModemManagerWatcher::new("org.freedesktop.ModemManager1", ApiVersion::V1);
        let factory = MockProxyFactory::default();
        factory.modem_equipment_ids.lock().unwrap().insert("/modem/0".to_string(), "1234".to_string());
        let enumerator = FixedEnumerator(vec!["/modem/0".to_string()]);
        let mut manager = manager();

        watcher.on_appear(":1.42", &enumerator, &factory, &mut manager).await.unwrap();

        assert!(watcher.is_present());
        assert!(watcher.modem_exists("/modem/0"));
        let device_id = watcher.device_for("/modem/0").unwrap();
        assert_eq!(manager.device(device_id).unwrap().mac_address(), "1234");
    }

    #[tokio::test]
    async fn on_appear_is_idempotent_for_the_same_path() {
        let mut watcher = ModemManagerWatcher::new("org.freedesktop.ModemManager1", ApiVersion::V1);
        let factory = MockProxyFactory::default();
        factory.modem_equipment_ids.lock().unwrap().insert("/modem/0".to_string(), "1234".to_string());
        let enumerator = FixedEnumerator(vec!["/modem/0".to_string(), "/modem/0".to_string()]);
        let mut manager = manager();

        watcher.on_appear(":1.42", &enumerator, &factory, &mut manager).await.unwrap();
        assert_eq!(manager.device(watcher.device_for("/modem/0").unwrap()).is_some(), true);
    }

    #[tokio::test]
    async fn on_vanish_destroys_every_registered_device() {
        let mut watcher = ModemManagerWatcher::new("org.freedesktop.ModemManager1", ApiVersion::V1);
        let factory = MockProxyFactory::default();
        factory.modem_equipment_ids.lock().unwrap().insert("/modem/0".to_string(), "1234".to_string());
        let enumerator = FixedEnumerator(vec!["/modem/0".to_string()]);
        let mut manager = manager();

        watcher.on_appear(":1.42", &enumerator, &factory, &mut manager).await.unwrap();
        let device_id = watcher.device_for("/modem/0").unwrap();

        watcher.on_vanish(&mut manager);

        assert!(!watcher.is_present());
        assert!(!watcher.modem_exists("/modem/0"));
        assert!(manager.device(device_id).is_none());
    }

    #[tokio::test]
    async fn on_device_info_available_fills_in_the_link_identity() {
        let mut watcher = ModemManagerWatcher::new("org.freedesktop.ModemManager1", ApiVersion::V1);
        let factory = MockProxyFactory::default();
        factory.modem_equipment_ids.lock().unwrap().insert("/modem/0".to_string(), "1234".to_string());
        let enumerator = FixedEnumerator(vec!["/modem/0".to_string()]);
        let mut manager = manager();

        watcher.on_appear(":1.42", &enumerator, &factory, &mut manager).await.unwrap();
        let device_id = watcher.device_for("/modem/0").unwrap();
        assert_eq!(manager.device(device_id).unwrap().link_name(), "");
        assert_eq!(manager.device(device_id).unwrap().interface_index(), -1);

        watcher.on_device_info_available("/modem/0", "wwan0", 7, &mut manager);

        let device = manager.device(device_id).unwrap();
        assert_eq!(device.link_name(), "wwan0");
        assert_eq!(device.interface_index(), 7);
    }
}
