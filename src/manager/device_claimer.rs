//! Tracks interface names a bus peer has claimed for its own exclusive use,
//! keeping them off the Device-info black list only while claimed.

use std::collections::HashSet;

use crate::core::{Error, Result};

/// Claims and releases link names on behalf of one bus peer.
///
/// Dropping a `DeviceClaimer` (e.g. because its owning peer vanished from
/// the bus) releases every device it still holds.
pub struct DeviceClaimer {
    service_name: String,
    claimed: HashSet<String>,
    released: HashSet<String>,
}

impl DeviceClaimer {
    /// Creates a claimer associated with the bus peer named `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), claimed: HashSet::new(), released: HashSet::new() }
    }

    /// The bus peer this claimer watches for vanish notifications.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Claims `device_name`, adding it to the black list.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArguments`] if already claimed.
    pub fn claim(&mut self, device_name: &str) -> Result<()> {
        if self.claimed.contains(device_name) {
            return Err(Error::InvalidArguments(format!("device {device_name} had already been claimed")));
        }
        self.claimed.insert(device_name.to_string());
        self.released.remove(device_name);
        Ok(())
    }

    /// Releases `device_name`, removing it from the black list.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArguments`] if not currently claimed.
    pub fn release(&mut self, device_name: &str) -> Result<()> {
        if !self.claimed.remove(device_name) {
            return Err(Error::InvalidArguments(format!("device {device_name} has not been claimed")));
        }
        self.released.insert(device_name.to_string());
        Ok(())
    }

    /// Whether any device is currently claimed.
    #[must_use]
    pub fn devices_claimed(&self) -> bool {
        !self.claimed.is_empty()
    }

    /// Whether `device_name` was claimed and has since been released.
    #[must_use]
    pub fn is_device_released(&self, device_name: &str) -> bool {
        self.released.contains(device_name)
    }

    /// Every currently claimed device name.
    #[must_use]
    pub fn claimed_devices(&self) -> Vec<&str> {
        self.claimed.iter().map(String::as_str).collect()
    }

    /// Releases every claimed device. Called when the claiming peer
    /// vanishes from the bus.
    pub fn release_all(&mut self) {
        self.released.extend(self.claimed.drain());
    }
}

impl Drop for DeviceClaimer {
    fn drop(&mut self) {
        if self.devices_claimed() {
            self.release_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_then_release_round_trips() {
        let mut claimer = DeviceClaimer::new("org.example.Claimer");
        claimer.claim("wlan0").unwrap();
        assert!(claimer.devices_claimed());
        claimer.release("wlan0").unwrap();
        assert!(!claimer.devices_claimed());
        assert!(claimer.is_device_released("wlan0"));
    }

    #[test]
    fn claiming_twice_fails() {
        let mut claimer = DeviceClaimer::new("org.example.Claimer");
        claimer.claim("wlan0").unwrap();
        assert!(claimer.claim("wlan0").is_err());
    }

    #[test]
    fn releasing_unclaimed_fails() {
        let mut claimer = DeviceClaimer::new("org.example.Claimer");
        assert!(claimer.release("wlan0").is_err());
    }

    #[test]
    fn vanish_releases_all_claimed_devices() {
        let mut claimer = DeviceClaimer::new("org.example.Claimer");
        claimer.claim("wlan0").unwrap();
        claimer.claim("eth0").unwrap();
        claimer.release_all();
        assert!(!claimer.devices_claimed());
        assert!(claimer.is_device_released("wlan0"));
        assert!(claimer.is_device_released("eth0"));
    }

    #[test]
    fn drop_releases_claimed_devices() {
        let mut claimer = DeviceClaimer::new("org.example.Claimer");
        claimer.claim("wlan0").unwrap();
        drop(claimer);
        // DeviceClaimer's Drop impl is exercised for its side effect on an
        // external black list in the full daemon; here it only needs to
        // not panic when devices remain claimed.
    }
}
