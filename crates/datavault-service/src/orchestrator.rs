//! The vault use cases.
//!
//! [`VaultService`] owns the process-wide [`Cipher`] and [`TokenService`]
//! (both immutable after startup) plus a shared [`VaultStorage`]. Each call
//! is independent; the only cross-call ordering lives in the storage
//! layer's registration transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use datavault_store::{SecretKind, SecretStatus};
use datavault_vault::crypto::secrets_match;
use datavault_vault::{Cipher, IssuedToken, TokenService};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ServiceError};
use crate::identity::CallIdentity;
use crate::storage::VaultStorage;

// ═══════════════════════════════════════════════════════════════════════
//  Results
// ═══════════════════════════════════════════════════════════════════════

/// What `store` hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReceipt {
    pub id: String,
    pub kind: SecretKind,
    pub created_at: DateTime<Utc>,
}

/// A decrypted record returned by `retrieve`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    pub id: String,
    pub owner: String,
    pub kind: SecretKind,
    pub status: SecretStatus,
    /// Decrypted payload.
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("data", &format_args!("<{} bytes redacted>", self.data.len()))
            .field("created_at", &self.created_at)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  VaultService
// ═══════════════════════════════════════════════════════════════════════

/// Orchestrates registration, login and owner-scoped secret storage.
pub struct VaultService {
    storage: Arc<dyn VaultStorage>,
    cipher: Cipher,
    tokens: Arc<TokenService>,
}

impl VaultService {
    pub fn new(storage: Arc<dyn VaultStorage>, cipher: Cipher, tokens: Arc<TokenService>) -> Self {
        Self {
            storage,
            cipher,
            tokens,
        }
    }

    /// The token service used to issue credentials. The access interceptor
    /// verifies with the same instance.
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    // ── Register ────────────────────────────────────────────────────

    /// Create an account and issue its first token.
    ///
    /// The password is stored as an AEAD envelope. Nothing is issued unless
    /// the account row committed.
    #[instrument(skip(self, password))]
    pub async fn register(&self, login: &str, password: &str) -> Result<IssuedToken> {
        require_credentials(login, password)?;

        let envelope = self
            .cipher
            .seal(password.as_bytes())
            .map_err(|e| ServiceError::Internal(format!("failed to seal password: {e}")))?;
        self.storage.insert_user(login, envelope).await?;

        let issued = self.tokens.issue(login)?;
        info!(login = %login, "account registered");
        Ok(issued)
    }

    // ── Login ───────────────────────────────────────────────────────

    /// Check a login/password pair and issue a fresh token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, login: &str, password: &str) -> Result<IssuedToken> {
        require_credentials(login, password)?;

        let Some(envelope) = self.storage.find_user_password(login).await? else {
            debug!(login = %login, "login for unknown account");
            return Err(ServiceError::Authentication(
                "invalid login or password".into(),
            ));
        };

        let stored = self.cipher.open(&envelope)?;
        if !secrets_match(&stored, password.as_bytes()) {
            debug!(login = %login, "password mismatch");
            return Err(ServiceError::Authentication(
                "invalid login or password".into(),
            ));
        }

        let issued = self.tokens.issue(login)?;
        info!(login = %login, "login succeeded");
        Ok(issued)
    }

    // ── Store ───────────────────────────────────────────────────────

    /// Encrypt `data` and persist it as a new `NEW` record owned by the caller.
    #[instrument(skip(self, data), fields(login = %identity, len = data.len()))]
    pub async fn store(
        &self,
        identity: &CallIdentity,
        kind: &str,
        data: &[u8],
    ) -> Result<StoreReceipt> {
        let owner = require_identity(identity)?;
        if kind.is_empty() {
            return Err(ServiceError::Validation("kind must not be empty".into()));
        }
        let kind = SecretKind::parse(kind)
            .ok_or_else(|| ServiceError::Validation(format!("unknown secret kind: {kind}")))?;
        if data.is_empty() {
            return Err(ServiceError::Validation("data must not be empty".into()));
        }

        let envelope = self
            .cipher
            .seal(data)
            .map_err(|e| ServiceError::Internal(format!("failed to seal secret: {e}")))?;
        let record = self
            .storage
            .insert_secret(owner, kind, envelope, Utc::now())
            .await?;

        info!(record_id = %record.id, kind = %record.kind, "secret stored");
        Ok(StoreReceipt {
            id: record.id,
            kind: record.kind,
            created_at: record.created_at,
        })
    }

    // ── Retrieve ────────────────────────────────────────────────────

    /// Decrypt and return every record owned by the caller, newest first.
    ///
    /// A record that fails to open fails the whole call; no partial list is
    /// ever returned.
    #[instrument(skip(self), fields(login = %identity))]
    pub async fn retrieve(&self, identity: &CallIdentity) -> Result<Vec<Secret>> {
        let owner = require_identity(identity)?;

        let records = self.storage.list_secrets(owner).await?;
        let mut secrets = Vec::with_capacity(records.len());
        for record in records {
            let data = self.cipher.open(&record.ciphertext).map_err(|e| {
                warn!(record_id = %record.id, error = %e, "stored record failed to decrypt");
                ServiceError::Crypto(e)
            })?;
            secrets.push(Secret {
                id: record.id,
                owner: record.owner,
                kind: record.kind,
                status: record.status,
                data,
                created_at: record.created_at,
            });
        }

        debug!(count = secrets.len(), "secrets retrieved");
        Ok(secrets)
    }

    // ── Delete ──────────────────────────────────────────────────────

    /// Delete record `id` if the caller owns it. A missing or foreign id is
    /// a silent no-op.
    #[instrument(skip(self), fields(login = %identity))]
    pub async fn delete(&self, identity: &CallIdentity, id: &str) -> Result<()> {
        let owner = require_identity(identity)?;
        if id.is_empty() {
            return Err(ServiceError::Validation("id must not be empty".into()));
        }

        let removed = self.storage.delete_secret(owner, id).await?;
        info!(record_id = %id, removed, "secret delete handled");
        Ok(())
    }

    // ── Ping ────────────────────────────────────────────────────────

    /// Check that the storage backend is reachable on behalf of an
    /// authenticated caller.
    #[instrument(skip(self), fields(login = %identity))]
    pub async fn ping(&self, identity: &CallIdentity) -> Result<()> {
        require_identity(identity)?;
        self.storage.ping().await.map_err(|e| {
            warn!(error = %e, "storage ping failed");
            ServiceError::from(e)
        })
    }
}

impl std::fmt::Debug for VaultService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultService")
            .field("cipher", &self.cipher)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

// ── validation helpers ──────────────────────────────────────────────

fn require_credentials(login: &str, password: &str) -> Result<()> {
    if login.is_empty() {
        return Err(ServiceError::Validation("login must not be empty".into()));
    }
    if password.is_empty() {
        return Err(ServiceError::Validation(
            "password must not be empty".into(),
        ));
    }
    Ok(())
}

fn require_identity(identity: &CallIdentity) -> Result<&str> {
    match identity.login() {
        "" => Err(ServiceError::MissingIdentity),
        login => Ok(login),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;
    use datavault_store::{Database, SecretRecord, StoreError, StoreResult};
    use datavault_vault::crypto::random_bytes;

    use super::*;
    use crate::storage::SqliteStorage;

    fn cipher() -> Cipher {
        Cipher::new(&[7u8; 32]).unwrap()
    }

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(&[9u8; 32], Duration::hours(24)).unwrap())
    }

    async fn service() -> VaultService {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        VaultService::new(Arc::new(SqliteStorage::new(db)), cipher(), tokens())
    }

    fn identity_for(svc: &VaultService, token: &str) -> CallIdentity {
        CallIdentity::from_claims(&svc.tokens().verify(token).unwrap())
    }

    // ── register / login ────────────────────────────────────────────

    #[tokio::test]
    async fn register_issues_token_for_login() {
        let svc = service().await;
        let issued = svc.register("alice", "pw1").await.unwrap();

        let claims = svc.tokens().verify(&issued.token).unwrap();
        assert_eq!(claims.login, "alice");
    }

    #[tokio::test]
    async fn register_rejects_empty_fields() {
        let svc = service().await;
        assert!(matches!(
            svc.register("", "pw").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.register("alice", "").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn register_twice_is_duplicate() {
        let svc = service().await;
        svc.register("alice", "pw1").await.unwrap();
        let err = svc.register("alice", "other").await.unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateLogin { .. }));
    }

    #[tokio::test]
    async fn login_with_correct_password() {
        let svc = service().await;
        svc.register("alice", "pw1").await.unwrap();

        let issued = svc.login("alice", "pw1").await.unwrap();
        assert_eq!(svc.tokens().verify(&issued.token).unwrap().login, "alice");
    }

    #[tokio::test]
    async fn login_with_wrong_password_or_unknown_login() {
        let svc = service().await;
        svc.register("alice", "pw1").await.unwrap();

        assert!(matches!(
            svc.login("alice", "pw2").await,
            Err(ServiceError::Authentication(_))
        ));
        assert!(matches!(
            svc.login("mallory", "pw1").await,
            Err(ServiceError::Authentication(_))
        ));
        assert!(matches!(
            svc.login("alice", "").await,
            Err(ServiceError::Validation(_))
        ));
    }

    // ── store / retrieve / delete ───────────────────────────────────

    #[tokio::test]
    async fn store_retrieve_delete_cycle() {
        let svc = service().await;
        let issued = svc.register("alice", "pw1").await.unwrap();
        let me = identity_for(&svc, &issued.token);

        let receipt = svc.store(&me, "text", b"hello").await.unwrap();
        assert_eq!(receipt.kind, SecretKind::Text);

        let secrets = svc.retrieve(&me).await.unwrap();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].id, receipt.id);
        assert_eq!(secrets[0].data, b"hello");
        assert_eq!(secrets[0].owner, "alice");
        assert_eq!(secrets[0].status, SecretStatus::New);

        svc.delete(&me, &receipt.id).await.unwrap();
        assert!(svc.retrieve(&me).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_validates_kind_and_payload() {
        let svc = service().await;
        svc.register("alice", "pw1").await.unwrap();
        let issued = svc.login("alice", "pw1").await.unwrap();
        let me = identity_for(&svc, &issued.token);

        for (kind, data) in [("", &b"x"[..]), ("video", &b"x"[..]), ("text", &b""[..])] {
            assert!(matches!(
                svc.store(&me, kind, data).await,
                Err(ServiceError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn delete_requires_id() {
        let svc = service().await;
        let issued = svc.register("alice", "pw1").await.unwrap();
        let me = identity_for(&svc, &issued.token);
        assert!(matches!(
            svc.delete(&me, "").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn empty_identity_is_rejected() {
        let svc = service().await;
        let claims = datavault_vault::Claims {
            login: String::new(),
            iat: 0,
            exp: 1,
        };
        let nobody = CallIdentity::from_claims(&claims);

        assert!(matches!(
            svc.store(&nobody, "text", b"x").await,
            Err(ServiceError::MissingIdentity)
        ));
        assert!(matches!(
            svc.retrieve(&nobody).await,
            Err(ServiceError::MissingIdentity)
        ));
        assert!(matches!(
            svc.delete(&nobody, "id").await,
            Err(ServiceError::MissingIdentity)
        ));
    }

    #[test]
    fn secret_debug_redacts_payload() {
        let secret = Secret {
            id: "r1".into(),
            owner: "alice".into(),
            kind: SecretKind::Password,
            status: SecretStatus::New,
            data: b"hunter2".to_vec(),
            created_at: Utc::now(),
        };
        let debug = format!("{secret:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("7 bytes redacted"));
    }

    // ── failing storage ─────────────────────────────────────────────

    /// Storage whose records cannot be opened with the service key, plus one
    /// that fails every call.
    struct StubStorage {
        records: Vec<SecretRecord>,
        fail: bool,
    }

    #[async_trait]
    impl VaultStorage for StubStorage {
        async fn insert_user(&self, _login: &str, _password: Vec<u8>) -> StoreResult<()> {
            if self.fail {
                return Err(StoreError::TaskJoin("storage offline".into()));
            }
            Ok(())
        }

        async fn find_user_password(&self, _login: &str) -> StoreResult<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn insert_secret(
            &self,
            _owner: &str,
            _kind: SecretKind,
            _envelope: Vec<u8>,
            _created_at: DateTime<Utc>,
        ) -> StoreResult<SecretRecord> {
            Err(StoreError::TaskJoin("storage offline".into()))
        }

        async fn list_secrets(&self, _owner: &str) -> StoreResult<Vec<SecretRecord>> {
            Ok(self.records.clone())
        }

        async fn delete_secret(&self, _owner: &str, _id: &str) -> StoreResult<bool> {
            Ok(false)
        }

        async fn ping(&self) -> StoreResult<()> {
            if self.fail {
                return Err(StoreError::TaskJoin("storage offline".into()));
            }
            Ok(())
        }
    }

    fn record(id: &str, ciphertext: Vec<u8>) -> SecretRecord {
        SecretRecord {
            id: id.into(),
            owner: "alice".into(),
            kind: SecretKind::Text,
            status: SecretStatus::New,
            ciphertext,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn retrieve_fails_closed_on_corrupt_record() {
        let good = cipher().seal(b"fine").unwrap();
        let bad = random_bytes(40).unwrap();
        let storage = StubStorage {
            records: vec![record("good", good), record("bad", bad)],
            fail: false,
        };
        let svc = VaultService::new(Arc::new(storage), cipher(), tokens());
        let me = identity_for(&svc, &svc.tokens().issue("alice").unwrap().token);

        let err = svc.retrieve(&me).await.unwrap_err();
        assert!(matches!(err, ServiceError::Crypto(_)));
    }

    #[tokio::test]
    async fn storage_failures_surface_as_internal() {
        let storage = StubStorage {
            records: Vec::new(),
            fail: true,
        };
        let svc = VaultService::new(Arc::new(storage), cipher(), tokens());
        let me = identity_for(&svc, &svc.tokens().issue("alice").unwrap().token);

        assert!(matches!(
            svc.register("alice", "pw").await,
            Err(ServiceError::Internal(_))
        ));
        assert!(matches!(
            svc.store(&me, "text", b"x").await,
            Err(ServiceError::Internal(_))
        ));
        assert!(matches!(svc.ping(&me).await, Err(ServiceError::Internal(_))));
    }

    #[tokio::test]
    async fn ping_requires_identity() {
        let storage = StubStorage {
            records: Vec::new(),
            fail: false,
        };
        let svc = VaultService::new(Arc::new(storage), cipher(), tokens());
        let me = identity_for(&svc, &svc.tokens().issue("alice").unwrap().token);

        svc.ping(&me).await.unwrap();

        let nobody = CallIdentity::from_claims(&datavault_vault::Claims {
            login: String::new(),
            iat: 0,
            exp: 1,
        });
        assert!(matches!(
            svc.ping(&nobody).await,
            Err(ServiceError::MissingIdentity)
        ));
    }
}
