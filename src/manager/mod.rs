//! Owns the Device and Service registries and enforces a single-best-service
//! policy across heterogeneous technologies.

pub mod device_claimer;

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};

pub use device_claimer::DeviceClaimer;

use crate::{
    core::{Error, Result},
    device::Device,
    ids::{DeviceId, ServiceId},
    portal_detector::{AttemptResult, PortalDetector, Prober},
    profile::Profile,
    service::{FailureReason, Service, State, TransitionEffect},
    technology::{DEFAULT_TECHNOLOGY_ORDER, Technology},
};

/// Holds every Profile, Device and Service the daemon knows about, and
/// elects the one Service the host should be connected through.
pub struct Manager {
    profiles: Vec<Profile>,
    devices: Vec<Option<Device>>,
    services: Vec<Option<Service>>,
    default_technology_order: Vec<Technology>,
    default_service: Option<ServiceId>,
    claimers: HashMap<String, DeviceClaimer>,
    portal_detector: PortalDetector,
    portal_url: Option<String>,
    device_black_list: Vec<String>,
    passive_mode: bool,
}

impl Manager {
    /// Creates an empty Manager. Portal checks on the elected default
    /// Service are issued through `prober`, scheduled on `dispatcher`.
    #[must_use]
    pub fn new(prober: Arc<dyn Prober>, dispatcher: crate::dispatcher::EventDispatcher) -> Self {
        Self {
            profiles: Vec::new(),
            devices: Vec::new(),
            services: Vec::new(),
            default_technology_order: DEFAULT_TECHNOLOGY_ORDER.to_vec(),
            default_service: None,
            claimers: HashMap::new(),
            portal_detector: PortalDetector::new(prober, dispatcher),
            portal_url: None,
            device_black_list: Vec::new(),
            passive_mode: false,
        }
    }

    /// Replaces the technology preference order used to elect the default
    /// Service.
    pub fn set_default_technology_order(&mut self, order: Vec<Technology>) {
        self.default_technology_order = order;
    }

    /// Sets the URL the [`PortalDetector`] probes when started on a newly
    /// elected default Service. `None` restores
    /// [`crate::portal_detector::DEFAULT_URL`].
    pub fn set_portal_url(&mut self, url: Option<String>) {
        self.portal_url = url;
    }

    /// Replaces the set of link names [`Manager::drive_auto_connect`]
    /// never brings up.
    pub fn set_device_black_list(&mut self, list: Vec<String>) {
        self.device_black_list = list;
    }

    /// Sets passive mode: while enabled, [`Manager::drive_auto_connect`]
    /// is a no-op, matching `--passive-mode`'s "manage no Device by
    /// default" contract.
    pub fn set_passive_mode(&mut self, passive_mode: bool) {
        self.passive_mode = passive_mode;
    }

    /// Pushes a Profile onto the top of the active stack.
    pub fn push_profile(&mut self, profile: Profile) {
        self.profiles.push(profile);
    }

    /// Pops the topmost Profile, if it is not the persistent default.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArguments`] if the stack is empty or the
    /// topmost profile is the persistent default.
    pub fn pop_profile(&mut self) -> Result<Profile> {
        match self.profiles.last() {
            Some(p) if p.is_persistent() => {
                return Err(Error::InvalidArguments("cannot pop the persistent default profile".to_string()));
            }
            None => return Err(Error::InvalidArguments("profile stack is empty".to_string())),
            Some(_) => {}
        }
        Ok(self.profiles.pop().expect("checked non-empty above"))
    }

    /// Registers a Device, returning its arena index.
    pub fn add_device(&mut self, device: Device) -> DeviceId {
        self.devices.push(Some(device));
        self.devices.len() - 1
    }

    /// Registers a Service, returning its arena index.
    pub fn add_service(&mut self, service: Service) -> ServiceId {
        self.services.push(Some(service));
        self.services.len() - 1
    }

    /// Removes and returns the Device at `id`, if present. Clears
    /// `default_service` if the removed Device was backing it, so a
    /// subsequent [`Manager::recompute_default_service`] re-elects.
    pub fn remove_device(&mut self, id: DeviceId) -> Option<Device> {
        self.devices.get_mut(id).and_then(Option::take)
    }

    /// Removes and returns the Service at `id`, if present.
    pub fn remove_service(&mut self, id: ServiceId) -> Option<Service> {
        if self.default_service == Some(id) {
            self.default_service = None;
        }
        self.services.get_mut(id).and_then(Option::take)
    }

    /// Shared access to a Device by id.
    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id).and_then(Option::as_ref)
    }

    /// Mutable access to a Device by id.
    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(id).and_then(Option::as_mut)
    }

    /// Shared access to a Service by id.
    #[must_use]
    pub fn service(&self, id: ServiceId) -> Option<&Service> {
        self.services.get(id).and_then(Option::as_ref)
    }

    /// Mutable access to a Service by id.
    pub fn service_mut(&mut self, id: ServiceId) -> Option<&mut Service> {
        self.services.get_mut(id).and_then(Option::as_mut)
    }

    /// The currently elected default Service, if any.
    #[must_use]
    pub fn default_service(&self) -> Option<ServiceId> {
        self.default_service
    }

    /// Claims `device_name` on behalf of bus peer `claimant`, adding it to
    /// the black list.
    ///
    /// # Errors
    /// Propagates [`DeviceClaimer::claim`]'s error.
    pub fn claim_interface(&mut self, claimant: &str, device_name: &str) -> Result<()> {
        self.claimers.entry(claimant.to_string()).or_insert_with(|| DeviceClaimer::new(claimant)).claim(device_name)
    }

    /// Releases `device_name` previously claimed by `claimant`.
    ///
    /// # Errors
    /// Propagates [`DeviceClaimer::release`]'s error.
    pub fn release_interface(&mut self, claimant: &str, device_name: &str) -> Result<()> {
        let claimer = self
            .claimers
            .get_mut(claimant)
            .ok_or_else(|| Error::InvalidArguments(format!("no devices claimed by {claimant}")))?;
        claimer.release(device_name)
    }

    /// Releases every device claimed by `claimant`, e.g. because it
    /// vanished from the bus.
    pub fn on_claimant_vanished(&mut self, claimant: &str) {
        if let Some(mut claimer) = self.claimers.remove(claimant) {
            claimer.release_all();
        }
    }

    /// Whether `device_name` is currently claimed by any peer.
    #[must_use]
    pub fn is_device_claimed(&self, device_name: &str) -> bool {
        self.claimers.values().any(|c| c.claimed_devices().contains(&device_name))
    }

    fn best_service_of(&self, technology: Technology) -> Option<ServiceId> {
        self.services
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|svc| (id, svc)))
            .filter(|(_, svc)| svc.technology() == technology)
            .max_by(|(ia, a), (ib, b)| {
                (a.state().rank(), a.priority(), a.favorite(), a.auto_connect(), *ia)
                    .cmp(&(b.state().rank(), b.priority(), b.favorite(), b.auto_connect(), *ib))
            })
            .map(|(id, _)| id)
    }

    fn elect_default(&self) -> Option<ServiceId> {
        for technology in &self.default_technology_order {
            if let Some(id) = self.best_service_of(*technology) {
                if self.service(id).expect("just selected").state().rank() >= State::Connected.rank() {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Re-runs the best-service-per-technology and default-technology-order
    /// election, swapping [`PortalDetector`] between the old and new
    /// default Service if the winner changed.
    ///
    /// `on_portal_result` is invoked with the elected Service's id and each
    /// portal-check attempt result. Returns `true` if the default Service
    /// changed.
    pub fn recompute_default_service<F>(&mut self, now: DateTime<Utc>, on_portal_result: F) -> bool
    where
        F: Fn(ServiceId, AttemptResult) + Send + Sync + 'static,
    {
        let _ = now;
        let elected = self.elect_default();
        if elected == self.default_service {
            return false;
        }

        if self.default_service.is_some() {
            self.portal_detector.stop();
        }

        self.default_service = elected;

        if let Some(id) = elected {
            if self.service(id).expect("just elected").state() == State::Connected {
                let url = self.portal_url.clone();
                self.portal_detector.start(url, move |result| on_portal_result(id, result));
            }
        }

        true
    }

    /// Whether `link_name` is on the configured device black list.
    #[must_use]
    pub fn is_device_black_listed(&self, link_name: &str) -> bool {
        self.device_black_list.iter().any(|name| name == link_name)
    }

    /// Brings up `id`'s Service, connecting its bound Device first.
    ///
    /// # Errors
    /// Propagates the Device's or the Service's connect error.
    pub fn connect_service(&mut self, id: ServiceId, reason: &str, now: DateTime<Utc>, user_initiated: bool) -> Result<()> {
        if let Some(device_id) = self.service(id).and_then(Service::device_id) {
            if let Some(device) = self.device_mut(device_id) {
                device.connect(id)?;
            }
        }
        let service =
            self.service_mut(id).ok_or_else(|| Error::InvalidArguments(format!("no such service {id}")))?;
        service.connect(reason, now, user_initiated)
    }

    /// Tears down `id`'s Service and, if bound, its Device.
    pub fn disconnect_service(&mut self, id: ServiceId, now: DateTime<Utc>, user_initiated: bool) {
        if let Some(device_id) = self.service(id).and_then(Service::device_id) {
            if let Some(device) = self.device_mut(device_id) {
                let _ = device.disconnect(id);
            }
        }
        if let Some(service) = self.service_mut(id) {
            if user_initiated {
                service.user_initiated_disconnect(now);
            } else {
                service.disconnect(now);
            }
        }
    }

    /// Transitions `id`'s Service to `new_state`, immediately retrying a
    /// connect if out-of-credits detection asks for one.
    pub fn transition_service(&mut self, id: ServiceId, new_state: State, now: DateTime<Utc>) {
        let Some(service) = self.service_mut(id) else { return };
        let effect = service.set_state(new_state, now);
        self.handle_transition_effect(id, effect, now);
    }

    /// As [`Manager::transition_service`], but records a concrete failure
    /// reason.
    pub fn fail_service(&mut self, id: ServiceId, reason: FailureReason, now: DateTime<Utc>) {
        let Some(service) = self.service_mut(id) else { return };
        let effect = service.set_failure(reason, now);
        self.handle_transition_effect(id, effect, now);
    }

    fn handle_transition_effect(&mut self, id: ServiceId, effect: TransitionEffect, now: DateTime<Utc>) {
        if effect != TransitionEffect::RequestReconnect {
            return;
        }
        if let Err(error) = self.connect_service(id, "out-of-credits reconnect", now, false) {
            tracing::warn!(service = id, %error, "out-of-credits reconnect attempt failed");
        }
    }

    /// Attempts to connect every currently auto-connectable Service whose
    /// Device is not black-listed. A no-op while `passive_mode` is set.
    pub fn drive_auto_connect(&mut self, now: DateTime<Utc>) {
        if self.passive_mode {
            return;
        }

        let candidates: Vec<ServiceId> =
            self.services.iter().enumerate().filter_map(|(id, slot)| slot.as_ref().map(|_| id)).collect();

        for id in candidates {
            let auto_connect = self.service(id).is_some_and(Service::auto_connect);
            if !auto_connect {
                continue;
            }

            let device_id = self.service(id).and_then(Service::device_id);
            let link_name = device_id.and_then(|d| self.device(d)).map(Device::link_name);
            if link_name.is_some_and(|name| self.is_device_black_listed(&name)) {
                continue;
            }

            let device_running = device_id.and_then(|d| self.device(d)).is_some_and(Device::running);
            let connectable = self.service(id).is_some_and(|s| s.is_auto_connectable(device_running).is_ok());
            if !connectable {
                continue;
            }

            if let Err(error) = self.connect_service(id, "auto-connect", now, false) {
                tracing::debug!(service = id, %error, "auto-connect attempt failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::portal_detector::ProbeOutcome;

    struct NeverRespondProber;

    #[async_trait::async_trait]
    impl Prober for NeverRespondProber {
        async fn probe(&self, _url: &str) -> ProbeOutcome {
            ProbeOutcome::DnsFailure
        }
    }

    fn manager() -> Manager {
        Manager::new(Arc::new(NeverRespondProber), crate::dispatcher::EventDispatcher::new())
    }

    fn connectable_service(manager: &mut Manager, technology: Technology, name: &str) -> ServiceId {
        let mut service = Service::new(name, technology);
        let device = manager.add_device(Device::new(name, 0, "aa:bb:cc:dd:ee:ff", technology));
        service.bind_device(Some(device));
        service.recompute_connectable(true);
        manager.add_service(service)
    }

    #[test]
    fn elects_higher_priority_technology_when_both_connected() {
        let mut manager = manager();
        manager.set_default_technology_order(vec![Technology::Ethernet, Technology::Wifi]);

        let wifi = connectable_service(&mut manager, Technology::Wifi, "wifi0");
        let eth = connectable_service(&mut manager, Technology::Ethernet, "eth0");

        manager.service_mut(wifi).unwrap().connect("test", Utc::now(), true).unwrap();
        manager.service_mut(wifi).unwrap().set_state(State::Connected, Utc::now());
        manager.service_mut(eth).unwrap().connect("test", Utc::now(), true).unwrap();
        manager.service_mut(eth).unwrap().set_state(State::Connected, Utc::now());

        let changed = manager.recompute_default_service(Utc::now(), |_, _| {});
        assert!(changed);
        assert_eq!(manager.default_service(), Some(eth));
    }

    #[test]
    fn no_connected_service_elects_nothing() {
        let mut manager = manager();
        connectable_service(&mut manager, Technology::Wifi, "wifi0");
        let changed = manager.recompute_default_service(Utc::now(), |_, _| {});
        assert!(!changed);
        assert_eq!(manager.default_service(), None);
    }

    #[test]
    fn swapping_default_starts_portal_detector_on_new_winner() {
        let mut manager = manager();
        manager.set_default_technology_order(vec![Technology::Wifi]);
        let wifi = connectable_service(&mut manager, Technology::Wifi, "wifi0");
        manager.service_mut(wifi).unwrap().connect("test", Utc::now(), true).unwrap();
        manager.service_mut(wifi).unwrap().set_state(State::Connected, Utc::now());

        let results = Arc::new(Mutex::new(Vec::new()));
        let results_clone = results.clone();
        manager.recompute_default_service(Utc::now(), move |id, result| {
            results_clone.lock().unwrap().push((id, result));
        });
        assert_eq!(manager.default_service(), Some(wifi));
    }

    #[test]
    fn claim_then_release_interface_round_trips() {
        let mut manager = manager();
        manager.claim_interface("org.example.Peer", "wlan0").unwrap();
        assert!(manager.is_device_claimed("wlan0"));
        manager.release_interface("org.example.Peer", "wlan0").unwrap();
        assert!(!manager.is_device_claimed("wlan0"));
    }

    #[test]
    fn claimant_vanishing_releases_every_claimed_device() {
        let mut manager = manager();
        manager.claim_interface("org.example.Peer", "wlan0").unwrap();
        manager.claim_interface("org.example.Peer", "eth0").unwrap();
        manager.on_claimant_vanished("org.example.Peer");
        assert!(!manager.is_device_claimed("wlan0"));
        assert!(!manager.is_device_claimed("eth0"));
    }

    #[test]
    fn remove_service_clears_it_as_default_and_frees_its_slot() {
        let mut manager = manager();
        manager.set_default_technology_order(vec![Technology::Wifi]);
        let wifi = connectable_service(&mut manager, Technology::Wifi, "wifi0");
        manager.service_mut(wifi).unwrap().connect("test", Utc::now(), true).unwrap();
        manager.service_mut(wifi).unwrap().set_state(State::Connected, Utc::now());
        manager.recompute_default_service(Utc::now(), |_, _| {});
        assert_eq!(manager.default_service(), Some(wifi));

        manager.remove_service(wifi);
        assert_eq!(manager.default_service(), None);
        assert!(manager.service(wifi).is_none());
    }

    #[test]
    fn pop_profile_refuses_to_remove_the_persistent_default() {
        use tempfile::tempdir;

        use crate::store::JsonStore;

        let dir = tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("default.json")).unwrap();
        let mut manager = manager();
        manager.push_profile(Profile::new("default", Box::new(store), true));
        assert!(manager.pop_profile().is_err());
    }

    fn start_device_of(manager: &mut Manager, service: ServiceId) {
        let device_id = manager.service(service).unwrap().device_id().unwrap();
        manager.device_mut(device_id).unwrap().start().unwrap();
    }

    #[test]
    fn drive_auto_connect_connects_every_auto_connectable_service() {
        let mut manager = manager();
        let wifi = connectable_service(&mut manager, Technology::Wifi, "wifi0");
        start_device_of(&mut manager, wifi);
        manager.service_mut(wifi).unwrap().set_auto_connect(true);

        manager.drive_auto_connect(Utc::now());

        assert_eq!(manager.service(wifi).unwrap().state(), State::Associating);
    }

    #[test]
    fn drive_auto_connect_skips_black_listed_devices() {
        let mut manager = manager();
        let wifi = connectable_service(&mut manager, Technology::Wifi, "wifi0");
        start_device_of(&mut manager, wifi);
        manager.service_mut(wifi).unwrap().set_auto_connect(true);
        manager.set_device_black_list(vec!["wifi0".to_string()]);

        manager.drive_auto_connect(Utc::now());

        assert_eq!(manager.service(wifi).unwrap().state(), State::Idle);
    }

    #[test]
    fn drive_auto_connect_is_a_noop_in_passive_mode() {
        let mut manager = manager();
        let wifi = connectable_service(&mut manager, Technology::Wifi, "wifi0");
        start_device_of(&mut manager, wifi);
        manager.service_mut(wifi).unwrap().set_auto_connect(true);
        manager.set_passive_mode(true);

        manager.drive_auto_connect(Utc::now());

        assert_eq!(manager.service(wifi).unwrap().state(), State::Idle);
    }

    #[test]
    fn disconnect_service_tears_down_the_device_and_the_service() {
        let mut manager = manager();
        let wifi = connectable_service(&mut manager, Technology::Wifi, "wifi0");
        start_device_of(&mut manager, wifi);
        manager.connect_service(wifi, "test", Utc::now(), true).unwrap();

        manager.disconnect_service(wifi, Utc::now(), true);

        let device_id = manager.service(wifi).unwrap().device_id().unwrap();
        assert_eq!(manager.service(wifi).unwrap().state(), State::Idle);
        assert_eq!(manager.device(device_id).unwrap().selected_service(), None);
    }

    #[test]
    fn fail_service_drives_a_reconnect_through_out_of_credits() {
        let mut manager = manager();
        let wifi = connectable_service(&mut manager, Technology::Wifi, "wifi0");
        start_device_of(&mut manager, wifi);
        manager.service_mut(wifi).unwrap().set_enforce_out_of_credits_detection(true);

        let t0 = Utc::now();
        manager.connect_service(wifi, "test", t0, false).unwrap();
        manager.fail_service(wifi, FailureReason::ConnectionFailed, t0 + chrono::Duration::seconds(1));

        assert_eq!(manager.service(wifi).unwrap().state(), State::Associating);
    }
}
