//! Persistence for encrypted secret records.
//!
//! Every query is scoped by `owner`: there is no way through this API to
//! list or delete another owner's records. The `data` column always holds
//! an AEAD envelope produced by the service layer; this module never sees
//! plaintext.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// What a secret's plaintext represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretKind {
    /// Free-form text.
    Text,
    /// A login/password pair for some other service.
    Password,
    /// Arbitrary bytes (files).
    Binary,
    /// Bank card details.
    Card,
}

impl SecretKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 4] = [Self::Text, Self::Password, Self::Binary, Self::Card];

    /// Convert to the string stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Password => "password",
            Self::Binary => "binary",
            Self::Card => "card",
        }
    }

    /// Parse from the string stored in SQLite.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for SecretKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing status of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecretStatus {
    /// Stored and not processed further.
    New,
}

impl SecretStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
        }
    }

    fn parse(s: &str) -> StoreResult<Self> {
        match s {
            "NEW" => Ok(Self::New),
            other => Err(StoreError::InvalidArgument(format!(
                "unknown secret status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for SecretStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored secret. `ciphertext` is the sealed envelope, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    /// Opaque identifier (UUID v7).
    pub id: String,
    /// Login of the owning account.
    pub owner: String,
    /// What the plaintext represents.
    pub kind: SecretKind,
    /// Processing status.
    pub status: SecretStatus,
    /// The AEAD envelope.
    pub ciphertext: Vec<u8>,
    /// When the record was stored (millisecond precision).
    pub created_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════════════════
//  SecretStore
// ═══════════════════════════════════════════════════════════════════════

/// Owner-scoped CRUD on the `secrets` table.
#[derive(Clone)]
pub struct SecretStore {
    db: Database,
}

impl SecretStore {
    /// Create a new secret store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new record with status `NEW` and return it.
    #[instrument(skip(self, ciphertext), fields(len = ciphertext.len()))]
    pub async fn insert(
        &self,
        owner: &str,
        kind: SecretKind,
        ciphertext: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> StoreResult<SecretRecord> {
        if owner.is_empty() {
            return Err(StoreError::InvalidArgument("owner must not be empty".into()));
        }

        let record = SecretRecord {
            id: Uuid::now_v7().to_string(),
            owner: owner.to_string(),
            kind,
            status: SecretStatus::New,
            ciphertext,
            created_at: DateTime::from_timestamp_millis(created_at.timestamp_millis())
                .unwrap_or(created_at),
        };

        let row = record.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO secrets (id, owner, kind, status, data, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        row.id,
                        row.owner,
                        row.kind.as_str(),
                        row.status.as_str(),
                        row.ciphertext,
                        row.created_at.timestamp_millis()
                    ],
                )?;
                Ok(())
            })
            .await?;

        debug!(record_id = %record.id, owner = %record.owner, kind = %record.kind, "secret inserted");
        Ok(record)
    }

    /// List every record owned by `owner`, newest first.
    #[instrument(skip(self))]
    pub async fn list_by_owner(&self, owner: &str) -> StoreResult<Vec<SecretRecord>> {
        let owner = owner.to_string();
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, owner, kind, status, data, created_at FROM secrets \
                     WHERE owner = ?1 ORDER BY created_at DESC, id DESC",
                )?;
                let rows = stmt.query_map(rusqlite::params![owner], |row| {
                    Ok(SecretRow {
                        id: row.get(0)?,
                        owner: row.get(1)?,
                        kind: row.get(2)?,
                        status: row.get(3)?,
                        data: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?;

                let mut records = Vec::new();
                for row in rows {
                    records.push(row?.into_record()?);
                }
                Ok(records)
            })
            .await
    }

    /// Delete the record `id` if and only if it belongs to `owner`.
    ///
    /// Returns whether a row was removed. A missing or foreign record is not
    /// an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, owner: &str, id: &str) -> StoreResult<bool> {
        let owner = owner.to_string();
        let id = id.to_string();
        let removed = self
            .db
            .execute(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM secrets WHERE id = ?1 AND owner = ?2",
                    rusqlite::params![id, owner],
                )?)
            })
            .await?;

        debug!(removed, "secret delete executed");
        Ok(removed > 0)
    }
}

// ── row mapping ──────────────────────────────────────────────────────

struct SecretRow {
    id: String,
    owner: String,
    kind: String,
    status: String,
    data: Vec<u8>,
    created_at: i64,
}

impl SecretRow {
    fn into_record(self) -> StoreResult<SecretRecord> {
        let kind = SecretKind::parse(&self.kind).ok_or_else(|| {
            StoreError::InvalidArgument(format!("unknown secret kind: {}", self.kind))
        })?;
        let created_at = DateTime::from_timestamp_millis(self.created_at).ok_or_else(|| {
            StoreError::InvalidArgument(format!("invalid timestamp: {}", self.created_at))
        })?;

        Ok(SecretRecord {
            id: self.id,
            owner: self.owner,
            kind,
            status: SecretStatus::parse(&self.status)?,
            ciphertext: self.data,
            created_at,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::UserStore;

    async fn setup() -> SecretStore {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        let users = UserStore::new(db.clone());
        users.insert("alice", vec![1]).await.unwrap();
        users.insert("bob", vec![2]).await.unwrap();
        SecretStore::new(db)
    }

    #[test]
    fn kind_string_roundtrip() {
        for kind in SecretKind::ALL {
            assert_eq!(SecretKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SecretKind::parse("TEXT"), None);
        assert_eq!(SecretKind::parse("video"), None);
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SecretKind::Card).unwrap(), "\"card\"");
        assert_eq!(serde_json::to_string(&SecretStatus::New).unwrap(), "\"NEW\"");
    }

    #[tokio::test]
    async fn insert_then_list() {
        let store = setup().await;
        let now = Utc::now();

        let inserted = store
            .insert("alice", SecretKind::Text, vec![9, 9, 9], now)
            .await
            .unwrap();

        let listed = store.list_by_owner("alice").await.unwrap();
        assert_eq!(listed, vec![inserted.clone()]);
        assert_eq!(inserted.status, SecretStatus::New);
        assert_eq!(
            inserted.created_at.timestamp_millis(),
            now.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = setup().await;
        let t0 = Utc::now();

        store
            .insert("alice", SecretKind::Text, vec![1], t0)
            .await
            .unwrap();
        store
            .insert("alice", SecretKind::Card, vec![2], t0 + Duration::seconds(5))
            .await
            .unwrap();

        let kinds: Vec<SecretKind> = store
            .list_by_owner("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.kind)
            .collect();
        assert_eq!(kinds, [SecretKind::Card, SecretKind::Text]);
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner() {
        let store = setup().await;

        store
            .insert("alice", SecretKind::Password, vec![1], Utc::now())
            .await
            .unwrap();

        assert!(store.list_by_owner("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_by_owner() {
        let store = setup().await;
        let record = store
            .insert("alice", SecretKind::Binary, vec![1], Utc::now())
            .await
            .unwrap();

        assert!(store.delete("alice", &record.id).await.unwrap());
        assert!(store.list_by_owner("alice").await.unwrap().is_empty());
        assert!(!store.delete("alice", &record.id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_by_other_owner_is_noop() {
        let store = setup().await;
        let record = store
            .insert("alice", SecretKind::Card, vec![1], Utc::now())
            .await
            .unwrap();

        assert!(!store.delete("bob", &record.id).await.unwrap());
        assert_eq!(store.list_by_owner("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_for_unknown_owner_fails() {
        let store = setup().await;
        let result = store
            .insert("ghost", SecretKind::Text, vec![1], Utc::now())
            .await;
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
    }

    #[tokio::test]
    async fn empty_owner_rejected() {
        let store = setup().await;
        let result = store.insert("", SecretKind::Text, vec![1], Utc::now()).await;
        assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
    }
}
