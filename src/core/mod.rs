//! Closed error taxonomy and the crate-wide `Result` alias.
//!
//! Every bus-facing operation returns at most one [`Error`]; recoverable
//! failures inside a state machine (a single portal-detection attempt
//! failing, a Service bouncing back to `Idle`) are never surfaced through
//! this type — they are observable only as state transitions.

use thiserror::Error;

/// Closed fault taxonomy shared by every component, propagated to the bus
/// boundary unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The operation completed.
    #[error("success")]
    Success,

    /// The operation was accepted but will complete asynchronously; the
    /// caller will be signalled on completion.
    #[error("operation initiated")]
    OperationInitiated,

    /// The target is already connected.
    #[error("already connected")]
    AlreadyConnected,

    /// An entity with this identity already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Unclassified internal failure, e.g. an I/O error from the
    /// persistent store.
    #[error("internal error: {0}")]
    InternalError(String),

    /// A method or property argument was malformed or inapplicable.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// A supplied network name (SSID) was invalid.
    #[error("invalid network name: {0}")]
    InvalidNetworkName(String),

    /// A supplied passphrase failed validation.
    #[error("invalid passphrase")]
    InvalidPassphrase,

    /// A property name or value was rejected by its accessor.
    #[error("invalid property: {0}")]
    InvalidProperty(String),

    /// The operation required a connected entity that was not connected.
    #[error("not connected")]
    NotConnected,

    /// The named entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is not implemented.
    #[error("not implemented")]
    NotImplemented,

    /// A cellular operation required home-network registration.
    #[error("not on home network")]
    NotOnHomeNetwork,

    /// A cellular operation required network registration.
    #[error("not registered")]
    NotRegistered,

    /// The operation is not supported by this entity.
    #[error("not supported")]
    NotSupported,

    /// The operation was aborted, typically by a subsequent `Stop`.
    #[error("operation aborted")]
    OperationAborted,

    /// The operation exceeded its deadline.
    #[error("operation timed out")]
    OperationTimeout,

    /// A passphrase is required before the operation can proceed.
    #[error("passphrase required")]
    PassphraseRequired,

    /// The caller is not permitted to perform this operation.
    #[error("permission denied")]
    PermissionDenied,
}

impl Error {
    /// Returns `true` for variants that represent a caller contract
    /// violation rather than a runtime/environment failure.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidArguments(_)
                | Error::InvalidNetworkName(_)
                | Error::InvalidPassphrase
                | Error::InvalidProperty(_)
                | Error::PermissionDenied
        )
    }
}

/// Crate-wide `Result` alias, defaulting the error type to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
