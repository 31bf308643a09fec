//! Cryptographic core for DataVault.
//!
//! This crate is pure bytes-in/bytes-out: it knows nothing about users,
//! records, or storage. It provides the two primitives every other layer
//! builds on.
//!
//! # Modules
//!
//! - [`crypto`]: AES-GCM envelope encryption with a fresh random nonce per call.
//! - [`token`]: HS256 identity tokens binding a login to a validity window.
//! - [`error`]: Unified error types.
//!
//! # Quick Start
//!
//! ```rust
//! use chrono::Duration;
//! use datavault_vault::{Cipher, TokenService, crypto};
//!
//! # fn example() -> datavault_vault::Result<()> {
//! let cipher = Cipher::new(&crypto::random_bytes(crypto::KEY_LEN)?)?;
//! let envelope = cipher.seal(b"4111 1111 1111 1111")?;
//! assert_eq!(cipher.open(&envelope)?, b"4111 1111 1111 1111");
//!
//! let tokens = TokenService::new(&crypto::random_bytes(64)?, Duration::hours(24))?;
//! let issued = tokens.issue("alice")?;
//! assert_eq!(tokens.verify(&issued.token)?.login, "alice");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod crypto;
pub mod error;
pub mod token;

// Re-export the most commonly used types at the crate root for convenience.
pub use crypto::Cipher;
pub use error::{Result, VaultError};
pub use token::{Claims, IssuedToken, TokenService};
