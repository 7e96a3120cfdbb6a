//! Shill - a connection-manager daemon.
//!
//! This crate owns the central connection-management state machine: a
//! registry of [`service::Service`] candidates, a registry of
//! [`device::Device`] links, a [`manager::Manager`] that enforces a
//! single-best-service policy across technologies, and a
//! [`portal_detector::PortalDetector`] that bounds the transition from
//! "connected" to "online". Per-transport plumbing (wpa_supplicant,
//! ModemManager, DHCP, kernel netlink) is reached only through
//! [`proxy_factory::ProxyFactory`].

/// Closed error taxonomy and the crate-wide `Result` alias.
pub mod core;

/// Shared reactive-cell and macro plumbing used across modules.
pub mod common;

/// Task scheduling and shutdown coordination.
pub mod dispatcher;

/// Generic key-value store and the persistent on-disk backing for it.
pub mod store;

/// Per-property-change-run callback aggregation.
pub mod callback_list;

/// Per-ICCID cellular activation-state tracking.
pub mod activating_iccid_store;

/// The technology enum shared by Service and Device.
pub mod technology;

/// Arena index types for Service and Device.
pub mod ids;

/// A candidate network attachment and its persisted configuration.
pub mod service;

/// A physical or logical network link and its lifecycle state machine.
pub mod device;

/// A named, persisted collection of Service entries.
pub mod profile;

/// Bounded-attempt HTTP probe for the connected-to-online transition.
pub mod portal_detector;

/// Per-transport proxy construction, isolated from the rest of the core.
pub mod proxy_factory;

/// Device/Service registries and the single-best-service election policy.
pub mod manager;

/// ModemManager presence tracking and modem enumeration.
pub mod modem_manager_watcher;

/// Generic-netlink (nl80211) broadcast/reply dispatch.
pub mod config80211;

/// Scoped temporary PEM/DER certificate files.
pub mod certificate_file;

/// The bus-facing property reflection layer.
pub mod property_store;

/// Daemon command-line surface.
pub mod cli;

/// Filesystem layout for persisted state.
pub mod paths;

/// Structured logging setup.
pub mod logging;

pub use core::{Error, Result};
