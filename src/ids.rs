//! Arena indices for the entities [`crate::manager::Manager`] owns.
//!
//! Service and Device refer to each other by these opaque indices rather
//! than by reference, so the pair can be mutated independently without a
//! `Rc`/`RefCell` cycle; all lookups go back through the
//! [`crate::manager::Manager`]'s slabs.

/// Identifies a [`crate::service::Service`] within a
/// [`crate::manager::Manager`]'s registry.
pub type ServiceId = usize;

/// Identifies a [`crate::device::Device`] within a
/// [`crate::manager::Manager`]'s registry.
pub type DeviceId = usize;
