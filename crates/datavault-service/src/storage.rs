//! Storage facade consumed by the orchestrator.
//!
//! [`VaultStorage`] is the seam between use cases and persistence. The
//! production implementation, [`SqliteStorage`], delegates to the
//! `datavault-store` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use datavault_store::{Database, SecretKind, SecretRecord, SecretStore, StoreResult, UserStore};

/// Persistence operations the orchestrator relies on.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait VaultStorage: Send + Sync {
    /// Insert an account inside a serializable transaction. A taken login
    /// fails with `StoreError::DuplicateLogin`.
    async fn insert_user(&self, login: &str, password: Vec<u8>) -> StoreResult<()>;

    /// Fetch the stored password envelope for `login`.
    async fn find_user_password(&self, login: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Persist a new record owned by `owner`.
    async fn insert_secret(
        &self,
        owner: &str,
        kind: SecretKind,
        envelope: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> StoreResult<SecretRecord>;

    /// Every record owned by `owner`, newest first.
    async fn list_secrets(&self, owner: &str) -> StoreResult<Vec<SecretRecord>>;

    /// Delete `id` only if owned by `owner`; returns whether a row went away.
    async fn delete_secret(&self, owner: &str, id: &str) -> StoreResult<bool>;

    /// Check that the backing store answers queries.
    async fn ping(&self) -> StoreResult<()>;
}

/// [`VaultStorage`] over a shared SQLite [`Database`].
#[derive(Clone)]
pub struct SqliteStorage {
    db: Database,
    users: UserStore,
    secrets: SecretStore,
}

impl SqliteStorage {
    /// Build both table stores over one database handle.
    pub fn new(db: Database) -> Self {
        Self {
            users: UserStore::new(db.clone()),
            secrets: SecretStore::new(db.clone()),
            db,
        }
    }
}

#[async_trait]
impl VaultStorage for SqliteStorage {
    async fn insert_user(&self, login: &str, password: Vec<u8>) -> StoreResult<()> {
        self.users.insert(login, password).await
    }

    async fn find_user_password(&self, login: &str) -> StoreResult<Option<Vec<u8>>> {
        self.users.find_password(login).await
    }

    async fn insert_secret(
        &self,
        owner: &str,
        kind: SecretKind,
        envelope: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> StoreResult<SecretRecord> {
        self.secrets.insert(owner, kind, envelope, created_at).await
    }

    async fn list_secrets(&self, owner: &str) -> StoreResult<Vec<SecretRecord>> {
        self.secrets.list_by_owner(owner).await
    }

    async fn delete_secret(&self, owner: &str, id: &str) -> StoreResult<bool> {
        self.secrets.delete(owner, id).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.db.ping().await
    }
}
