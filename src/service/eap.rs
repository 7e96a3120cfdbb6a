//! 802.1X EAP credential bundle, opaque to everything but storage.

use crate::store::{StoreInterface, Value};

macro_rules! plain_key {
    ($name:literal) => {
        concat!("EAP.", $name)
    };
}

const KEY_EAP: &str = plain_key!("EAP");
const KEY_INNER_EAP: &str = plain_key!("InnerEAP");
const KEY_CLIENT_CERT: &str = plain_key!("ClientCert");
const KEY_CERT_ID: &str = plain_key!("CertID");
const KEY_PRIVATE_KEY: &str = plain_key!("PrivateKey");
const KEY_KEY_ID: &str = plain_key!("KeyID");
const KEY_CA_CERT: &str = plain_key!("CACert");
const KEY_CA_CERT_ID: &str = plain_key!("CACertID");
const KEY_USE_SYSTEM_CAS: &str = plain_key!("UseSystemCAs");
const KEY_PIN: &str = plain_key!("PIN");
const KEY_KEY_MGMT: &str = plain_key!("KeyMgmt");

/// The 802.1X EAP credential bundle a Service carries, opaque to the core
/// state machine beyond "is it present/valid enough to connect".
///
/// Password-like fields (`identity`, `anonymous_identity`,
/// `private_key_password`, `password`) are persisted through
/// [`StoreInterface::set_crypted_string`] rather than as plain values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EapCredentials {
    /// Outer identity presented to the authentication server.
    pub identity: String,
    /// The outer EAP method (e.g. `"PEAP"`, `"TTLS"`).
    pub eap: String,
    /// The inner (phase-2) EAP method.
    pub inner_eap: String,
    /// Identity presented before the TLS tunnel is established.
    pub anonymous_identity: String,
    /// Client certificate (PEM), if authenticating via TLS.
    pub client_cert: String,
    /// Client certificate id in the NSS database, as an alternative to
    /// `client_cert`.
    pub cert_id: String,
    /// Client private key (PEM).
    pub private_key: String,
    /// Passphrase protecting `private_key`.
    pub private_key_password: String,
    /// Private key id in the NSS database.
    pub key_id: String,
    /// CA certificate (PEM) to validate the server.
    pub ca_cert: String,
    /// CA certificate id in the NSS database.
    pub ca_cert_id: String,
    /// Trust the system CA bundle in addition to `ca_cert`/`ca_cert_id`.
    pub use_system_cas: bool,
    /// SIM PIN, for EAP-SIM/EAP-AKA.
    pub pin: String,
    /// Password for password-based inner methods (e.g. MSCHAPv2).
    pub password: String,
    /// `wpa_supplicant` `key_mgmt` string (e.g. `"WPA-EAP"`).
    pub key_mgmt: String,
}

impl EapCredentials {
    /// Returns `true` if enough fields are present to attempt 802.1X
    /// authentication: an identity and either a password or a client
    /// certificate/key.
    #[must_use]
    pub fn is_connectable(&self) -> bool {
        !self.identity.is_empty()
            && (!self.password.is_empty()
                || !self.client_cert.is_empty()
                || !self.cert_id.is_empty())
    }

    /// Populates `self` from `group` in `store`. Fields absent from
    /// storage are left at their default (empty string / `false`).
    pub fn load(&mut self, store: &dyn StoreInterface, group: &str) {
        self.identity = store.get_crypted_string(group, "Identity").unwrap_or_default();
        self.eap = read_string(store, group, KEY_EAP);
        self.inner_eap = read_string(store, group, KEY_INNER_EAP);
        self.anonymous_identity =
            store.get_crypted_string(group, "AnonymousIdentity").unwrap_or_default();
        self.client_cert = read_string(store, group, KEY_CLIENT_CERT);
        self.cert_id = read_string(store, group, KEY_CERT_ID);
        self.private_key = read_string(store, group, KEY_PRIVATE_KEY);
        self.private_key_password =
            store.get_crypted_string(group, "PrivateKeyPassword").unwrap_or_default();
        self.key_id = read_string(store, group, KEY_KEY_ID);
        self.ca_cert = read_string(store, group, KEY_CA_CERT);
        self.ca_cert_id = read_string(store, group, KEY_CA_CERT_ID);
        self.use_system_cas =
            store.get(group, KEY_USE_SYSTEM_CAS).and_then(Value::as_bool).unwrap_or(false);
        self.pin = read_string(store, group, KEY_PIN);
        self.password = store.get_crypted_string(group, "Password").unwrap_or_default();
        self.key_mgmt = read_string(store, group, KEY_KEY_MGMT);
    }

    /// Persists `self` into `group` in `store`.
    ///
    /// Empty strings are deleted rather than written. If
    /// `save_credentials` is `false`, the credential-bearing fields
    /// (`identity`, `anonymous_identity`, `private_key_password`,
    /// `password`, `pin`) are deleted instead of saved.
    pub fn save(&self, store: &mut dyn StoreInterface, group: &str, save_credentials: bool) {
        if save_credentials {
            write_crypted(store, group, "Identity", &self.identity);
            write_crypted(store, group, "AnonymousIdentity", &self.anonymous_identity);
            write_crypted(store, group, "PrivateKeyPassword", &self.private_key_password);
            write_crypted(store, group, "Password", &self.password);
            write_plain(store, group, KEY_PIN, &self.pin);
        } else {
            write_crypted(store, group, "Identity", "");
            write_crypted(store, group, "AnonymousIdentity", "");
            write_crypted(store, group, "PrivateKeyPassword", "");
            write_crypted(store, group, "Password", "");
            store.delete_key(group, KEY_PIN);
        }

        write_plain(store, group, KEY_EAP, &self.eap);
        write_plain(store, group, KEY_INNER_EAP, &self.inner_eap);
        write_plain(store, group, KEY_CLIENT_CERT, &self.client_cert);
        write_plain(store, group, KEY_CERT_ID, &self.cert_id);
        write_plain(store, group, KEY_PRIVATE_KEY, &self.private_key);
        write_plain(store, group, KEY_KEY_ID, &self.key_id);
        write_plain(store, group, KEY_CA_CERT, &self.ca_cert);
        write_plain(store, group, KEY_CA_CERT_ID, &self.ca_cert_id);
        store.set(group, KEY_USE_SYSTEM_CAS, Value::Bool(self.use_system_cas));
        write_plain(store, group, KEY_KEY_MGMT, &self.key_mgmt);
    }
}

fn read_string(store: &dyn StoreInterface, group: &str, key: &str) -> String {
    store.get(group, key).and_then(Value::as_str).map(str::to_string).unwrap_or_default()
}

fn write_plain(store: &mut dyn StoreInterface, group: &str, key: &str, value: &str) {
    if value.is_empty() {
        store.delete_key(group, key);
    } else {
        store.set(group, key, Value::String(value.to_string()));
    }
}

fn write_crypted(store: &mut dyn StoreInterface, group: &str, key: &str, value: &str) {
    if value.is_empty() {
        store.delete_key(group, &format!("crypted:{key}"));
    } else {
        store.set_crypted_string(group, key, value);
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::store::JsonStore;

    #[test]
    fn round_trips_through_a_store() {
        let dir = tempdir().unwrap();
        let mut store = JsonStore::open(dir.path().join("p.json")).unwrap();

        let mut creds = EapCredentials::default();
        creds.identity = "alice".to_string();
        creds.password = "hunter2".to_string();
        creds.key_mgmt = "WPA-EAP".to_string();
        creds.save(&mut store, "wifi_1", true);

        let mut loaded = EapCredentials::default();
        loaded.load(&store, "wifi_1");
        assert_eq!(loaded, creds);
    }

    #[test]
    fn save_credentials_false_drops_credential_fields_but_keeps_key_mgmt() {
        let dir = tempdir().unwrap();
        let mut store = JsonStore::open(dir.path().join("p.json")).unwrap();

        let mut creds = EapCredentials::default();
        creds.identity = "alice".to_string();
        creds.password = "hunter2".to_string();
        creds.key_mgmt = "WPA-EAP".to_string();
        creds.save(&mut store, "wifi_1", false);

        let mut loaded = EapCredentials::default();
        loaded.load(&store, "wifi_1");
        assert!(loaded.identity.is_empty());
        assert!(loaded.password.is_empty());
        assert_eq!(loaded.key_mgmt, "WPA-EAP");
    }

    #[test]
    fn is_connectable_requires_identity_and_a_secret() {
        let mut creds = EapCredentials::default();
        assert!(!creds.is_connectable());
        creds.identity = "alice".to_string();
        assert!(!creds.is_connectable());
        creds.password = "hunter2".to_string();
        assert!(creds.is_connectable());
    }
}
