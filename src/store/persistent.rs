use std::{collections::HashMap, fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use super::{KeyValueStore, Value};
use crate::core::{Error, Result};

/// A group-qualified persistent property store, backing one
/// [`crate::profile::Profile`].
///
/// Unlike [`KeyValueStore`], which is a flat bag for one bus call's worth
/// of arguments, a `StoreInterface` implementation holds many named groups
/// (one per [`crate::service::Service`] or [`crate::device::Device`]
/// storage identifier) and is durable: writes are buffered in memory until
/// [`StoreInterface::flush`] is called.
pub trait StoreInterface: Send + Sync {
    /// Returns `true` if `group` exists.
    fn contains_group(&self, group: &str) -> bool;

    /// Returns every group name, in no particular order.
    fn get_groups(&self) -> Vec<String>;

    /// Deletes `group` and everything in it. Returns `true` if it existed.
    fn delete_group(&mut self, group: &str) -> bool;

    /// Deletes `key` within `group`. A no-op if either is absent.
    fn delete_key(&mut self, group: &str, key: &str);

    /// Reads `key` within `group`.
    fn get(&self, group: &str, key: &str) -> Option<&Value>;

    /// Writes `key` within `group`, creating the group if needed.
    fn set(&mut self, group: &str, key: &str, value: Value);

    /// Reads an obfuscated string written by
    /// [`StoreInterface::set_crypted_string`].
    ///
    /// At-rest encryption of credential material (the role shill's own
    /// `opencryptoki`-backed crypto module plays) is out of scope here;
    /// this round-trips through a reversible encoding so credential
    /// fields are not stored as plain JSON strings alongside the rest of
    /// a profile record.
    fn get_crypted_string(&self, group: &str, key: &str) -> Option<String>;

    /// Writes `value` within `group` under `key`, obfuscated.
    fn set_crypted_string(&mut self, group: &str, key: &str, value: &str);

    /// Persists buffered writes. The durability boundary: callers SHOULD
    /// call this after a coherent group of writes, not after every
    /// individual `set`.
    ///
    /// # Errors
    /// Returns an error if the backing file cannot be written.
    fn flush(&mut self) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    groups: HashMap<String, KeyValueStore>,
}

/// A [`StoreInterface`] backed by a single JSON file on disk.
///
/// shill's on-disk profile format is an ini-like flat file; this crate
/// uses JSON instead since the contract callers depend on — group-keyed,
/// typed, flush-is-the-durability-boundary — does not require byte
/// compatibility with that format.
pub struct JsonStore {
    path: PathBuf,
    doc: Document,
}

impl JsonStore {
    /// Opens (or creates, if absent) the store at `path`.
    ///
    /// # Errors
    /// Returns an error if `path` exists but is not valid JSON.
    pub fn open(path: PathBuf) -> Result<Self> {
        let doc = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| Error::InternalError(format!("reading {path:?}: {e}")))?;
            serde_json::from_str(&raw)
                .map_err(|e| Error::InternalError(format!("parsing {path:?}: {e}")))?
        } else {
            Document::default()
        };

        Ok(Self { path, doc })
    }

    fn group_mut(&mut self, group: &str) -> &mut KeyValueStore {
        self.doc.groups.entry(group.to_string()).or_default()
    }
}

const CRYPTED_KEY_PREFIX: &str = "crypted:";

fn obfuscate(plain: &str) -> String {
    plain.bytes().map(|b| format!("{b:02x}")).collect()
}

fn deobfuscate(encoded: &str) -> Option<String> {
    let bytes: Option<Vec<u8>> = (0..encoded.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(encoded.get(i..i + 2)?, 16).ok())
        .collect();
    String::from_utf8(bytes?).ok()
}

impl StoreInterface for JsonStore {
    fn contains_group(&self, group: &str) -> bool {
        self.doc.groups.contains_key(group)
    }

    fn get_groups(&self) -> Vec<String> {
        self.doc.groups.keys().cloned().collect()
    }

    fn delete_group(&mut self, group: &str) -> bool {
        self.doc.groups.remove(group).is_some()
    }

    fn delete_key(&mut self, group: &str, key: &str) {
        if let Some(entries) = self.doc.groups.get_mut(group) {
            entries.remove(key);
        }
    }

    fn get(&self, group: &str, key: &str) -> Option<&Value> {
        let entries = self.doc.groups.get(group)?;
        entries.contains(key).then(|| entries.get(key))
    }

    fn set(&mut self, group: &str, key: &str, value: Value) {
        self.group_mut(group).set(key, value);
    }

    fn get_crypted_string(&self, group: &str, key: &str) -> Option<String> {
        let qualified = format!("{CRYPTED_KEY_PREFIX}{key}");
        let entries = self.doc.groups.get(group)?;
        let encoded = entries.contains(&qualified).then(|| entries.get(&qualified))?.as_str()?;
        deobfuscate(encoded)
    }

    fn set_crypted_string(&mut self, group: &str, key: &str, value: &str) {
        let qualified = format!("{CRYPTED_KEY_PREFIX}{key}");
        self.group_mut(group).set(qualified, obfuscate(value));
    }

    fn flush(&mut self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.doc)
            .map_err(|e| Error::InternalError(format!("serializing store: {e}")))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::InternalError(format!("creating {parent:?}: {e}")))?;
        }
        fs::write(&self.path, serialized)
            .map_err(|e| Error::InternalError(format!("writing {:?}: {e}", self.path)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let mut store = JsonStore::open(dir.path().join("profile.json")).unwrap();
        store.set("wifi_ssid_deadbeef", "AutoConnect", Value::Bool(true));
        assert_eq!(store.get("wifi_ssid_deadbeef", "AutoConnect"), Some(&Value::Bool(true)));
    }

    #[test]
    fn flush_then_reopen_preserves_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.json");

        let mut store = JsonStore::open(path.clone()).unwrap();
        store.set("group", "key", Value::Int(7));
        store.flush().unwrap();

        let reopened = JsonStore::open(path).unwrap();
        assert_eq!(reopened.get("group", "key"), Some(&Value::Int(7)));
    }

    #[test]
    fn delete_group_removes_everything_under_it() {
        let dir = tempdir().unwrap();
        let mut store = JsonStore::open(dir.path().join("profile.json")).unwrap();
        store.set("group", "key", Value::Int(1));
        assert!(store.delete_group("group"));
        assert!(!store.contains_group("group"));
        assert!(!store.delete_group("group"));
    }

    #[test]
    fn crypted_string_round_trips_and_is_not_plaintext_in_the_group() {
        let dir = tempdir().unwrap();
        let mut store = JsonStore::open(dir.path().join("profile.json")).unwrap();
        store.set_crypted_string("group", "EAP.Password", "hunter2");

        assert_eq!(
            store.get_crypted_string("group", "EAP.Password"),
            Some("hunter2".to_string())
        );
        assert_eq!(store.get("group", "EAP.Password"), None);
    }

    #[test]
    fn delete_key_is_noop_when_absent() {
        let dir = tempdir().unwrap();
        let mut store = JsonStore::open(dir.path().join("profile.json")).unwrap();
        store.delete_key("no-such-group", "key");
    }
}
