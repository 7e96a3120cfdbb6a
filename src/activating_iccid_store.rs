//! Per-SIM cellular activation intent, persisted across reboots.

use std::path::PathBuf;

use crate::{
    core::Result,
    store::{JsonStore, StoreInterface, Value},
};

const STORAGE_FILE_NAME: &str = "activating_iccid_store.json";
const GROUP_ID: &str = "activating-iccid-store";

const STATE_PENDING: i32 = 1;
const STATE_ACTIVATED: i32 = 2;

/// Cellular SIM activation intent, as tracked across a possible reboot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// No entry, or an entry whose stored value is outside `{1, 2}`.
    Unknown,
    /// Activation was requested but not yet confirmed.
    Pending,
    /// Activation was confirmed.
    Activated,
}

impl ActivationState {
    fn to_storage_int(self) -> i32 {
        match self {
            ActivationState::Pending => STATE_PENDING,
            ActivationState::Activated => STATE_ACTIVATED,
            ActivationState::Unknown => unreachable!("Unknown is never written"),
        }
    }

    fn from_storage_int(value: i32) -> Self {
        match value {
            STATE_PENDING => ActivationState::Pending,
            STATE_ACTIVATED => ActivationState::Activated,
            _ => ActivationState::Unknown,
        }
    }
}

/// A persistent `iccid → {Pending, Activated}` map, backed by a
/// [`JsonStore`]. All entries live under a single fixed group.
pub struct ActivatingIccidStore {
    store: JsonStore,
}

impl ActivatingIccidStore {
    /// Opens (or creates) the backing file under `dir`. Reopening the same
    /// directory preserves prior entries.
    ///
    /// # Errors
    /// Returns an error if the backing file exists but is not valid JSON.
    pub fn init_storage(dir: &std::path::Path) -> Result<Self> {
        let path: PathBuf = dir.join(STORAGE_FILE_NAME);
        Ok(Self { store: JsonStore::open(path)? })
    }

    /// Returns the activation state for `iccid`, defaulting to `Unknown`
    /// when absent or when the stored value is out of range.
    #[must_use]
    pub fn get_activation_state(&self, iccid: &str) -> ActivationState {
        match self.store.get(GROUP_ID, iccid).and_then(Value::as_int) {
            Some(raw) => ActivationState::from_storage_int(raw),
            None => ActivationState::Unknown,
        }
    }

    /// Sets the activation state for `iccid` and flushes immediately.
    ///
    /// # Errors
    /// Returns an error if the flush fails, or if `state` is
    /// [`ActivationState::Unknown`] (there is no on-disk representation
    /// for it; remove the entry instead via
    /// [`ActivatingIccidStore::remove_entry`]).
    pub fn set_activation_state(&mut self, iccid: &str, state: ActivationState) -> Result<()> {
        if state == ActivationState::Unknown {
            return Err(crate::core::Error::InvalidArguments(
                "ActivationState::Unknown has no on-disk representation".to_string(),
            ));
        }
        self.store.set(GROUP_ID, iccid, Value::Int(state.to_storage_int()));
        self.store.flush()
    }

    /// Deletes the entry for `iccid` and flushes immediately. A no-op (but
    /// still flushes) if no entry exists.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn remove_entry(&mut self, iccid: &str) -> Result<()> {
        self.store.delete_key(GROUP_ID, iccid);
        self.store.flush()
    }
}
