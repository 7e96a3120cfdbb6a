//! A candidate network attachment: one Wi-Fi SSID, one cellular APN
//! record, one Ethernet link.

mod cellular;
pub mod eap;
mod out_of_credits;
pub mod state;

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

pub use cellular::{ActivationState, CellularExtra, OnlinePaymentPortal, RoamingState};
pub use out_of_credits::{Action as OutOfCreditsAction, OutOfCreditsDetector};
pub use state::{FailureReason, State};

use crate::{
    common::Property,
    core::{Error, Result},
    ids::DeviceId,
    property_store::{PropertyStore, ValueKind},
    store::{StoreInterface, Value},
    technology::Technology,
};
pub use eap::EapCredentials;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(0);

/// Whether a Service should be checked for a captive portal after
/// reaching `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckPortal {
    /// Let the Manager decide based on technology and configuration.
    #[default]
    Auto,
    /// Always portal-check.
    Always,
    /// Never portal-check.
    Never,
}

/// The effect of a [`Service::set_state`] call that the caller (normally
/// the owning [`crate::device::Device`] or the [`crate::manager::Manager`])
/// must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Nothing further is required.
    None,
    /// Out-of-credits detection asks for another `Connect` attempt.
    RequestReconnect,
}

/// A candidate network attachment.
pub struct Service {
    serial_number: u64,
    storage_identifier: String,
    technology: Technology,

    name: Property<String>,
    state: Property<State>,
    failure: Property<Option<FailureReason>>,
    connectable: Property<bool>,

    auto_connect: Property<bool>,
    check_portal: Property<CheckPortal>,
    priority: Property<Option<i32>>,
    favorite: Property<bool>,
    save_credentials: Property<bool>,

    eap: EapCredentials,
    cellular: Option<CellularExtra>,

    device_id: Option<DeviceId>,
    profile_name: Option<String>,
    explicitly_disconnected: bool,

    out_of_credits: OutOfCreditsDetector,
    property_store: PropertyStore,
}

#[allow(clippy::too_many_arguments)]
fn build_property_store(
    name: &Property<String>,
    state: &Property<State>,
    failure: &Property<Option<FailureReason>>,
    connectable: &Property<bool>,
    auto_connect: &Property<bool>,
    check_portal: &Property<CheckPortal>,
    priority: &Property<Option<i32>>,
    favorite: &Property<bool>,
    save_credentials: &Property<bool>,
) -> PropertyStore {
    let mut store = PropertyStore::new();
    store.bind_string("Name", name, false);
    store.bind_bool("AutoConnect", auto_connect, false);
    store.bind_bool("Favorite", favorite, false);
    store.bind_bool("SaveCredentials", save_credentials, false);
    store.bind_bool("Connectable", connectable, true);

    let get_state = state.clone();
    store.register_read_only("State", ValueKind::String, move || Value::String(format!("{:?}", get_state.get())));

    let get_failure = failure.clone();
    store.register_read_only("Error", ValueKind::String, move || {
        Value::String(get_failure.get().map_or_else(String::new, |reason| format!("{reason:?}")))
    });

    let get_check_portal = check_portal.clone();
    let set_check_portal = check_portal.clone();
    store.register_read_write(
        "CheckPortal",
        ValueKind::String,
        move || {
            Value::String(
                match get_check_portal.get() {
                    CheckPortal::Auto => "auto",
                    CheckPortal::Always => "true",
                    CheckPortal::Never => "false",
                }
                .to_string(),
            )
        },
        move |value| match value {
            Value::String(s) => {
                set_check_portal.set(match s.as_str() {
                    "true" => CheckPortal::Always,
                    "false" => CheckPortal::Never,
                    _ => CheckPortal::Auto,
                });
                Ok(())
            }
            other => Err(Error::InvalidArguments(format!("expected a string, got {other:?}"))),
        },
    );

    let get_priority = priority.clone();
    let set_priority = priority.clone();
    store.register_read_write(
        "Priority",
        ValueKind::Int,
        move || Value::Int(get_priority.get().unwrap_or(0)),
        move |value| match value {
            Value::Int(v) => {
                set_priority.set(if v == 0 { None } else { Some(v) });
                Ok(())
            }
            other => Err(Error::InvalidArguments(format!("expected an int, got {other:?}"))),
        },
    );

    store
}

impl Service {
    /// Creates a new Service. `priority` defaults to `None` regardless of
    /// what a later [`Service::load`] finds, so a storage record missing
    /// the `Priority` key leaves the default untouched.
    #[must_use]
    pub fn new(storage_identifier: impl Into<String>, technology: Technology) -> Self {
        let serial_number = NEXT_SERIAL.fetch_add(1, Ordering::Relaxed);
        let name = Property::new(String::new());
        let state = Property::new(State::Idle);
        let failure = Property::new(None);
        let connectable = Property::new(false);
        let auto_connect = Property::new(false);
        let check_portal = Property::new(CheckPortal::Auto);
        let priority = Property::new(None);
        let favorite = Property::new(false);
        let save_credentials = Property::new(true);
        let property_store = build_property_store(
            &name,
            &state,
            &failure,
            &connectable,
            &auto_connect,
            &check_portal,
            &priority,
            &favorite,
            &save_credentials,
        );

        Self {
            serial_number,
            storage_identifier: storage_identifier.into(),
            technology,
            name,
            state,
            failure,
            connectable,
            auto_connect,
            check_portal,
            priority,
            favorite,
            save_credentials,
            eap: EapCredentials::default(),
            cellular: (technology == Technology::Cellular).then(CellularExtra::default),
            device_id: None,
            profile_name: None,
            explicitly_disconnected: false,
            out_of_credits: OutOfCreditsDetector::default(),
            property_store,
        }
    }

    /// Replaces non-alphanumeric characters in `raw` with `_`, for
    /// deriving a storage identifier from a caller-supplied name.
    #[must_use]
    pub fn sanitize_storage_identifier(raw: &str) -> String {
        raw.chars().map(|c| if c.is_alphanumeric() { c } else { '_' }).collect()
    }

    /// This Service's process-lifetime-unique serial number.
    #[must_use]
    pub fn serial_number(&self) -> u64 {
        self.serial_number
    }

    /// The storage identifier this Service is (or would be) persisted
    /// under.
    #[must_use]
    pub fn storage_identifier(&self) -> &str {
        &self.storage_identifier
    }

    /// The technology this Service belongs to.
    #[must_use]
    pub fn technology(&self) -> Technology {
        self.technology
    }

    /// The Device this Service is currently bound to, if any.
    #[must_use]
    pub fn device_id(&self) -> Option<DeviceId> {
        self.device_id
    }

    /// The Profile currently holding this Service's storage, if any.
    #[must_use]
    pub fn profile_name(&self) -> Option<&str> {
        self.profile_name.as_deref()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state.get()
    }

    /// Current failure reason, if `state() == State::Failure`.
    #[must_use]
    pub fn failure(&self) -> Option<FailureReason> {
        self.failure.get()
    }

    /// Whether all preconditions to attempt a connection are currently
    /// satisfied.
    #[must_use]
    pub fn connectable(&self) -> bool {
        self.connectable.get()
    }

    /// EAP credentials, for technologies that use 802.1X.
    #[must_use]
    pub fn eap(&self) -> &EapCredentials {
        &self.eap
    }

    /// Mutable EAP credentials; callers must follow with
    /// [`Service::recompute_connectable`] since a credential edit may
    /// change connectability.
    pub fn eap_mut(&mut self) -> &mut EapCredentials {
        &mut self.eap
    }

    /// Cellular-only extended state, if this Service is cellular.
    #[must_use]
    pub fn cellular(&self) -> Option<&CellularExtra> {
        self.cellular.as_ref()
    }

    /// Mutable cellular-only extended state.
    pub fn cellular_mut(&mut self) -> Option<&mut CellularExtra> {
        self.cellular.as_mut()
    }

    /// Out-of-credits detection state.
    #[must_use]
    pub fn out_of_credits(&self) -> &OutOfCreditsDetector {
        &self.out_of_credits
    }

    /// This Service's bus-facing property table.
    #[must_use]
    pub fn property_store(&self) -> &PropertyStore {
        &self.property_store
    }

    /// Enables or disables out-of-credits detection for this Service.
    pub fn set_enforce_out_of_credits_detection(&mut self, enforce: bool) {
        self.out_of_credits.enforce = enforce;
    }

    /// Sets the Device this Service is bound to and recomputes
    /// `connectable`.
    pub fn bind_device(&mut self, device_id: Option<DeviceId>) {
        self.device_id = device_id;
    }

    /// Sets the name of the [`crate::profile::Profile`] currently holding
    /// this Service's storage. Called by `Profile::adopt_service` and
    /// `Profile::abandon_service`; not meant to be called directly.
    pub fn bind_profile(&mut self, profile_name: Option<String>) {
        self.profile_name = profile_name;
    }

    /// Recomputes `connectable`: `device present ∧ credentials satisfied
    /// ∧ (cellular: activated)`. Must be called after anything that can
    /// affect those inputs (`bind_device`, EAP edits, cellular activation
    /// changes).
    ///
    /// Returns `true` iff the value changed.
    pub fn recompute_connectable(&mut self, device_running: bool) -> bool {
        let credentials_ok = match self.technology {
            Technology::Wifi => self.eap.eap.is_empty() || self.eap.is_connectable(),
            _ => true,
        };
        let cellular_ok =
            self.cellular.as_ref().map_or(true, CellularExtra::is_activated_enough_to_connect);

        let connectable = self.device_id.is_some() && device_running && credentials_ok && cellular_ok;
        self.connectable.set(connectable)
    }

    /// Names the property store name of this Service.
    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        self.name.set(name.into())
    }

    /// Current display name.
    #[must_use]
    pub fn name(&self) -> String {
        self.name.get()
    }

    /// Sets auto-connect policy.
    pub fn set_auto_connect(&mut self, auto_connect: bool) -> bool {
        self.auto_connect.set(auto_connect)
    }

    /// Current auto-connect policy.
    #[must_use]
    pub fn auto_connect(&self) -> bool {
        self.auto_connect.get()
    }

    /// Sets portal-check policy.
    pub fn set_check_portal(&mut self, check_portal: CheckPortal) -> bool {
        self.check_portal.set(check_portal)
    }

    /// Sets display priority (`None` restores the default ordering).
    pub fn set_priority(&mut self, priority: Option<i32>) -> bool {
        self.priority.set(priority)
    }

    /// Current display priority.
    #[must_use]
    pub fn priority(&self) -> Option<i32> {
        self.priority.get()
    }

    /// Sets favorite flag.
    pub fn set_favorite(&mut self, favorite: bool) -> bool {
        self.favorite.set(favorite)
    }

    /// Current favorite flag.
    #[must_use]
    pub fn favorite(&self) -> bool {
        self.favorite.get()
    }

    /// Sets whether credentials should be persisted on `Save`.
    pub fn set_save_credentials(&mut self, save: bool) -> bool {
        self.save_credentials.set(save)
    }

    /// Attempts to connect, moving to `Associating` if connectable.
    ///
    /// `user_initiated` suppresses out-of-credits detection for this
    /// attempt (matching [`OutOfCreditsDetector::on_connect`]).
    ///
    /// # Errors
    /// Returns [`Error::InvalidArguments`] if the Service is not
    /// connectable.
    pub fn connect(&mut self, reason: &str, now: DateTime<Utc>, user_initiated: bool) -> Result<()> {
        if !self.connectable() {
            return Err(Error::InvalidArguments(format!(
                "service {} is not connectable (reason: {reason})",
                self.storage_identifier
            )));
        }
        self.out_of_credits.on_connect(now, user_initiated);
        self.explicitly_disconnected = false;
        self.set_state(State::Associating, now);
        Ok(())
    }

    /// Tears down the connection and moves to `Idle`.
    pub fn disconnect(&mut self, now: DateTime<Utc>) {
        self.out_of_credits.cancel();
        self.set_state(State::Idle, now);
    }

    /// As [`Service::disconnect`], but also marks the disconnect as
    /// user-initiated, suppressing auto-connect until reload or resume.
    pub fn user_initiated_disconnect(&mut self, now: DateTime<Utc>) {
        self.explicitly_disconnected = true;
        self.disconnect(now);
    }

    /// Transitions to `new_state`, clearing `failure` (unless the new
    /// state is itself `Failure`) and running out-of-credits detection.
    ///
    /// Returns the effect the caller must act on.
    pub fn set_state(&mut self, new_state: State, now: DateTime<Utc>) -> TransitionEffect {
        let old_state = self.state.get();
        if old_state == new_state {
            return TransitionEffect::None;
        }

        self.state.set(new_state);
        if new_state != State::Failure {
            self.failure.set(None);
        }

        if self.out_of_credits.enforce {
            match self.out_of_credits.observe_transition(old_state, new_state, now) {
                OutOfCreditsAction::Reconnect => return TransitionEffect::RequestReconnect,
                OutOfCreditsAction::None
                | OutOfCreditsAction::Detected
                | OutOfCreditsAction::Intermittent => {}
            }
        }

        TransitionEffect::None
    }

    /// Sets `state ← Failure` and records `reason`, routing the transition
    /// through [`Service::set_state`] so out-of-credits detection observes
    /// it like any other transition.
    pub fn set_failure(&mut self, reason: FailureReason, now: DateTime<Utc>) -> TransitionEffect {
        self.failure.set(Some(reason));
        self.set_state(State::Failure, now)
    }

    /// Records that the system resumed from suspend, re-enabling
    /// auto-connect after a prior user-initiated disconnect and resetting
    /// the out-of-credits resume-ignore window.
    pub fn on_after_resume(&mut self, now: DateTime<Utc>) {
        self.explicitly_disconnected = false;
        self.out_of_credits.on_after_resume(now);
    }

    /// Returns `Ok(())` if the Manager may auto-connect this Service,
    /// `Err(reason)` with a stable reason code otherwise.
    ///
    /// # Errors
    /// See above.
    pub fn is_auto_connectable(&self, device_running: bool) -> std::result::Result<(), &'static str> {
        if !device_running {
            return Err("DeviceNotRunning");
        }
        if matches!(self.state.get(), State::Connected | State::Associating) {
            return Err("AlreadyConnecting");
        }
        if self.explicitly_disconnected {
            return Err("ExplicitDisconnect");
        }
        if let Some(cellular) = &self.cellular {
            if cellular.blocks_auto_connect() {
                return Err("CellularActivating");
            }
        }
        if self.out_of_credits.is_in_progress() {
            return Err("OutOfCreditsDetectionInProgress");
        }
        if self.out_of_credits.is_out_of_credits() {
            return Err("OutOfCredits");
        }
        Ok(())
    }

    /// Populates policy, credential, and cellular fields from `group` in
    /// `store`.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if `group` does not exist.
    pub fn load(&mut self, store: &dyn StoreInterface, group: &str) -> Result<()> {
        if !store.contains_group(group) {
            return Err(Error::NotFound(group.to_string()));
        }

        use crate::store::Value;

        if let Some(v) = store.get(group, "AutoConnect").and_then(Value::as_bool) {
            self.auto_connect.set(v);
        }
        if let Some(v) = store.get(group, "Favorite").and_then(Value::as_bool) {
            self.favorite.set(v);
        }
        if let Some(v) = store.get(group, "SaveCredentials").and_then(Value::as_bool) {
            self.save_credentials.set(v);
        }
        if let Some(v) = store.get(group, "Name").and_then(Value::as_str) {
            self.name.set(v.to_string());
        }
        if let Some(v) = store.get(group, "Priority").and_then(Value::as_int) {
            self.priority.set(Some(v));
        }
        self.check_portal.set(match store.get(group, "CheckPortal").and_then(Value::as_str) {
            Some("true") => CheckPortal::Always,
            Some("false") => CheckPortal::Never,
            _ => CheckPortal::Auto,
        });

        self.eap.load(store, group);
        self.explicitly_disconnected = false;
        Ok(())
    }

    /// Persists policy, credential, and cellular fields into `group` in
    /// `store`. Does not call [`StoreInterface::flush`]; the owning
    /// [`crate::profile::Profile`] is responsible for that.
    pub fn save(&self, store: &mut dyn StoreInterface, group: &str) {
        use crate::store::Value;

        store.set(group, "AutoConnect", Value::Bool(self.auto_connect.get()));
        store.set(group, "Favorite", Value::Bool(self.favorite.get()));
        store.set(group, "SaveCredentials", Value::Bool(self.save_credentials.get()));

        let name = self.name.get();
        if name.is_empty() {
            store.delete_key(group, "Name");
        } else {
            store.set(group, "Name", Value::String(name));
        }

        match self.priority.get() {
            Some(p) => store.set(group, "Priority", Value::Int(p)),
            None => store.delete_key(group, "Priority"),
        }

        let check_portal = match self.check_portal.get() {
            CheckPortal::Auto => None,
            CheckPortal::Always => Some("true"),
            CheckPortal::Never => Some("false"),
        };
        match check_portal {
            Some(v) => store.set(group, "CheckPortal", Value::String(v.to_string())),
            None => store.delete_key(group, "CheckPortal"),
        }

        self.eap.save(store, group, self.save_credentials.get());
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::tempdir;

    use super::*;
    use crate::store::JsonStore;

    fn connectable_service() -> Service {
        let mut service = Service::new("wifi_test", Technology::Wifi);
        service.bind_device(Some(0));
        service.recompute_connectable(true);
        service
    }

    #[test]
    fn connect_moves_to_associating() {
        let mut service = connectable_service();
        service.connect("user", Utc::now(), true).unwrap();
        assert_eq!(service.state(), State::Associating);
    }

    #[test]
    fn connect_fails_when_not_connectable() {
        let mut service = Service::new("wifi_test", Technology::Wifi);
        assert!(service.connect("user", Utc::now(), true).is_err());
    }

    #[test]
    fn set_state_to_current_value_is_a_noop_transition() {
        let mut service = connectable_service();
        service.set_state(State::Idle, Utc::now());
        assert_eq!(service.set_state(State::Idle, Utc::now()), TransitionEffect::None);
    }

    #[test]
    fn set_failure_then_any_non_failure_transition_clears_reason() {
        let mut service = connectable_service();
        service.set_failure(FailureReason::BadPassphrase, Utc::now());
        assert_eq!(service.failure(), Some(FailureReason::BadPassphrase));
        service.set_state(State::Idle, Utc::now());
        assert_eq!(service.failure(), None);
    }

    #[test]
    fn user_initiated_disconnect_blocks_auto_connect_until_resume() {
        let mut service = connectable_service();
        service.connect("user", Utc::now(), true).unwrap();
        service.user_initiated_disconnect(Utc::now());
        assert_eq!(service.is_auto_connectable(true), Err("ExplicitDisconnect"));

        service.on_after_resume(Utc::now());
        assert_eq!(service.is_auto_connectable(true), Ok(()));
    }

    #[test]
    fn user_initiated_disconnect_blocks_auto_connect_until_reload() {
        let mut service = connectable_service();
        service.connect("user", Utc::now(), true).unwrap();
        service.user_initiated_disconnect(Utc::now());
        assert_eq!(service.is_auto_connectable(true), Err("ExplicitDisconnect"));

        let dir = tempdir().unwrap();
        let mut store = JsonStore::open(dir.path().join("p.json")).unwrap();
        service.save(&mut store, "wifi_test");
        service.load(&store, "wifi_test").unwrap();
        assert_eq!(service.is_auto_connectable(true), Ok(()));
    }

    #[test]
    fn out_of_credits_detected_drives_three_connects() {
        let mut service = connectable_service();
        service.set_enforce_out_of_credits_detection(true);

        let t0 = Utc::now();
        let mut connect_calls = 1;
        service.connect("user", t0, false).unwrap();

        // Associating -> Failure: carrier silence, ask for a reconnect.
        let e1 = service.set_state(State::Failure, t0 + Duration::seconds(1));
        assert_eq!(e1, TransitionEffect::RequestReconnect);
        connect_calls += 1;

        service.set_state(State::Associating, t0 + Duration::seconds(1));
        service.set_state(State::Configuring, t0 + Duration::seconds(1));

        // Configuring -> Idle: carrier silence again, third and last retry.
        let e2 = service.set_state(State::Idle, t0 + Duration::seconds(1));
        assert_eq!(e2, TransitionEffect::RequestReconnect);
        connect_calls += 1;

        service.set_state(State::Associating, t0 + Duration::seconds(2));
        service.set_state(State::Configuring, t0 + Duration::seconds(2));
        service.set_state(State::Connected, t0 + Duration::seconds(2));

        // Connected -> Idle within the drop threshold: declare out-of-credits.
        let e3 = service.set_state(State::Idle, t0 + Duration::seconds(3));
        assert_eq!(e3, TransitionEffect::None);

        assert_eq!(connect_calls, 3);
        assert!(service.out_of_credits().is_out_of_credits());
        assert!(!service.out_of_credits().is_in_progress());
    }

    #[test]
    fn out_of_credits_skipped_after_resume() {
        let mut service = connectable_service();
        service.set_enforce_out_of_credits_detection(true);

        let t0 = Utc::now();
        service.on_after_resume(t0);
        service.connect("user", t0 + Duration::seconds(1), false).unwrap();

        let effect = service.set_state(State::Connected, t0 + Duration::seconds(2));
        assert_eq!(effect, TransitionEffect::None);
        let effect = service.set_state(State::Idle, t0 + Duration::seconds(3));
        assert_eq!(effect, TransitionEffect::None);

        assert!(!service.out_of_credits().is_out_of_credits());
        assert!(!service.out_of_credits().is_in_progress());
    }

    #[test]
    fn storage_identifier_is_sanitized() {
        assert_eq!(Service::sanitize_storage_identifier("wifi my-ssid!"), "wifi_my_ssid_");
    }

    #[test]
    fn property_store_reflects_live_field_changes() {
        use crate::store::Value;

        let mut service = connectable_service();
        assert_eq!(service.property_store().get("AutoConnect").unwrap(), Value::Bool(false));

        service.set_auto_connect(true);
        assert_eq!(service.property_store().get("AutoConnect").unwrap(), Value::Bool(true));

        service.property_store().set("Priority", Value::Int(5)).unwrap();
        assert_eq!(service.priority(), Some(5));
    }
}
