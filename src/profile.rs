//! A named, persisted collection of Service entries.
//!
//! A stack of profiles is active at any time (bottom = the persistent,
//! unremovable default profile; top = the most specific user profile);
//! the topmost profile owning a Service's storage identifier is the one
//! that holds it.

use crate::{
    core::{Error, Result},
    service::Service,
    store::StoreInterface,
};

/// A named persisted collection of Service entries.
pub struct Profile {
    name: String,
    persistent: bool,
    store: Box<dyn StoreInterface>,
}

impl Profile {
    /// Creates a Profile named `name` backed by `store`. `persistent`
    /// marks the default profile, which may not be removed from the
    /// stack.
    #[must_use]
    pub fn new(name: impl Into<String>, store: Box<dyn StoreInterface>, persistent: bool) -> Self {
        Self { name: name.into(), persistent, store }
    }

    /// This profile's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the persistent default profile.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Atomically (a) writes `service`'s current record under its
    /// storage identifier, and (b) binds `service` to this profile.
    ///
    /// Per this crate's resolution of the sampled source's ambiguous
    /// `set_profile` contract: a Service already bound to a profile MUST
    /// be abandoned (by its current owner) before being re-adopted here.
    /// Violating that in a debug build panics via `debug_assert!`; a
    /// release build instead logs a warning and proceeds, silently
    /// overwriting the binding rather than leaving the Service owned by
    /// two profiles at once.
    pub fn adopt_service(&mut self, service: &mut Service) {
        debug_assert!(
            service.profile_name().is_none(),
            "adopt_service: service {} already owned by profile {:?}; abandon it first",
            service.storage_identifier(),
            service.profile_name(),
        );
        if service.profile_name().is_some() {
            tracing::warn!(
                service = service.storage_identifier(),
                prior_profile = ?service.profile_name(),
                "adopting a service that was not explicitly abandoned first"
            );
        }

        let group = service.storage_identifier().to_string();
        service.save(&mut *self.store, &group);
        service.bind_profile(Some(self.name.clone()));
    }

    /// Deletes `service`'s storage record and clears its profile binding,
    /// if it was bound to this profile.
    pub fn abandon_service(&mut self, service: &mut Service) {
        self.store.delete_group(service.storage_identifier());
        if service.profile_name() == Some(self.name.as_str()) {
            service.bind_profile(None);
        }
    }

    /// Reads `service`'s record from this profile's storage into
    /// `service`, without claiming ownership (used to let a lower
    /// profile's entry be displayed while a higher profile has not yet
    /// adopted it).
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no record exists under `service`'s
    /// storage identifier.
    pub fn load_service(&self, service: &mut Service) -> Result<()> {
        let group = service.storage_identifier().to_string();
        service.load(&*self.store, &group)
    }

    /// Returns `true` if a record exists under `storage_identifier`.
    #[must_use]
    pub fn contains(&self, storage_identifier: &str) -> bool {
        self.store.contains_group(storage_identifier)
    }

    /// Applies first-time defaults to `service`, if no record yet exists
    /// for it in this profile. A no-op for a Service this profile already
    /// has an entry for.
    pub fn configure_service(&self, service: &mut Service) {
        if self.store.contains_group(service.storage_identifier()) {
            return;
        }
        service.set_auto_connect(true);
    }

    /// Applies first-time defaults to a newly discovered Device.
    ///
    /// This core does not persist any Device-level configuration (the
    /// Data Model carries no persisted Device fields), so this is
    /// currently a no-op; it exists to keep the Profile method surface
    /// complete for callers that expect it alongside `configure_service`.
    pub fn configure_device(&self, _link_name: &str) {}

    /// Removes the record stored under `storage_identifier`.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no such record exists.
    pub fn delete_entry(&mut self, storage_identifier: &str) -> Result<()> {
        if self.store.delete_group(storage_identifier) {
            Ok(())
        } else {
            Err(Error::NotFound(storage_identifier.to_string()))
        }
    }

    /// Flushes buffered writes to disk.
    ///
    /// # Errors
    /// Returns an error if the underlying store fails to flush.
    pub fn save(&mut self) -> Result<()> {
        self.store.flush()
    }
}
