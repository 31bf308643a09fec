//! # datavault-store
//!
//! Storage engine for DataVault.
//!
//! Provides SQLite-backed persistence for accounts and encrypted secret
//! records. All queries run on the blocking pool behind an async API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  UserStore    (users: login → envelope)  │
//! │  SecretStore  (secrets, owner-scoped)    │
//! ├─────────────────────────────────────────┤
//! │  Database (rusqlite WAL)                 │
//! │  Migrations (versioned, transactional)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use datavault_store::{Database, SecretStore, UserStore};
//!
//! let db = Database::open_and_migrate("data/datavault.db").await?;
//! let users = UserStore::new(db.clone());
//! let secrets = SecretStore::new(db);
//! ```

pub mod db;
pub mod error;
pub mod migration;
pub mod secret_store;
pub mod user_store;

// ── re-exports ───────────────────────────────────────────────────────

pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use secret_store::{SecretKind, SecretRecord, SecretStatus, SecretStore};
pub use user_store::UserStore;
