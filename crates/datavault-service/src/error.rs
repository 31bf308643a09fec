//! Service error taxonomy.
//!
//! Every orchestrator operation fails with exactly one [`ServiceError`]
//! variant. The transport maps each variant once to a caller-visible
//! response; nothing here is retried.

use datavault_store::StoreError;
use datavault_vault::VaultError;

/// Unified error type for the vault orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A required field is missing or empty, or a value is out of range.
    /// The caller must fix the request.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Wrong login/password pair. The caller must re-authenticate.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The login is already registered.
    #[error("login already taken: {login}")]
    DuplicateLogin { login: String },

    /// An authenticated operation was reached without a caller identity.
    #[error("no caller identity bound to this call")]
    MissingIdentity,

    /// Sealing or opening an envelope failed.
    #[error("crypto failure: {0}")]
    Crypto(#[from] VaultError),

    /// Storage, transaction or other unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateLogin { login } => Self::DuplicateLogin { login },
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Convenience alias used throughout the service crate.
pub type Result<T> = std::result::Result<T, ServiceError>;
