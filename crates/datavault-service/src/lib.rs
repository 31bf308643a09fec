//! # datavault-service
//!
//! Use-case layer of DataVault. [`VaultService`] exposes the five
//! operations (register, login, store, retrieve, delete) over a pluggable
//! [`VaultStorage`] facade. Every authenticated operation takes the
//! [`CallIdentity`] bound by the access interceptor and scopes all storage
//! access to that login.
//!
//! ```ignore
//! use std::sync::Arc;
//! use datavault_service::{SqliteStorage, VaultService};
//!
//! let storage = Arc::new(SqliteStorage::new(db));
//! let service = VaultService::new(storage, cipher, Arc::new(tokens));
//! let issued = service.register("alice", "pw1").await?;
//! ```

pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod storage;

pub use error::{Result, ServiceError};
pub use identity::CallIdentity;
pub use orchestrator::{Secret, StoreReceipt, VaultService};
pub use storage::{SqliteStorage, VaultStorage};
