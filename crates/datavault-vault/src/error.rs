//! Vault error types.
//!
//! All cryptographic operations surface errors through [`VaultError`], which
//! is the single error type returned by every public API in this crate.  Each
//! variant carries enough context for callers to decide how to handle the
//! failure without inspecting opaque strings.

/// Unified error type for the DataVault cryptographic core.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    // -- Key errors ---------------------------------------------------------
    /// The supplied key cannot be used to build the cipher or signer.
    #[error("invalid key: {reason}")]
    InvalidKey { reason: String },

    // -- Envelope errors ----------------------------------------------------
    /// Encryption failed (e.g. CSPRNG failure, ring internal error).
    #[error("encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// Decryption failed (e.g. wrong key, corrupted or truncated envelope).
    #[error("decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    // -- Token errors -------------------------------------------------------
    /// The token is not a well-formed `header.claims.signature` triple.
    #[error("malformed token: {reason}")]
    TokenMalformed { reason: String },

    /// The token signature does not match its header and claims.
    #[error("token signature mismatch")]
    TokenSignature,

    /// The token's validity window has passed.
    #[error("token expired")]
    TokenExpired,

    /// The token's issued-at time lies in the future.
    #[error("token not yet valid")]
    TokenNotYetValid,

    // -- Underlying errors --------------------------------------------------
    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Generic ------------------------------------------------------------
    /// Catch-all for unexpected internal errors.
    #[error("internal vault error: {0}")]
    Internal(String),
}

impl VaultError {
    /// Whether this error came from token verification rather than from
    /// the cipher.
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::TokenMalformed { .. }
                | Self::TokenSignature
                | Self::TokenExpired
                | Self::TokenNotYetValid
        )
    }
}

/// Convenience alias used throughout the vault crate.
pub type Result<T> = std::result::Result<T, VaultError>;
