//! Integration tests for the datavault-service crate.
//!
//! Drives `VaultService` over an on-disk SQLite database with the real
//! codec and token service.

use std::sync::Arc;

use chrono::Duration;
use datavault_service::{CallIdentity, ServiceError, SqliteStorage, VaultService};
use datavault_store::Database;
use datavault_vault::{Cipher, TokenService};

async fn service(dir: &tempfile::TempDir) -> Arc<VaultService> {
    let db = Database::open_and_migrate(dir.path().join("vault.db"))
        .await
        .unwrap();
    let cipher = Cipher::new(&[0x11; 32]).unwrap();
    let tokens = TokenService::new(&[0x22; 48], Duration::hours(24)).unwrap();
    Arc::new(VaultService::new(
        Arc::new(SqliteStorage::new(db)),
        cipher,
        Arc::new(tokens),
    ))
}

fn identity(svc: &VaultService, token: &str) -> CallIdentity {
    CallIdentity::from_claims(&svc.tokens().verify(token).unwrap())
}

// ═══════════════════════════════════════════════════════════════════════
//  End-to-end scenario
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn alice_stores_retrieves_and_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir).await;

    let t1 = svc.register("alice", "pw1").await.unwrap();
    let alice = identity(&svc, &t1.token);

    svc.store(&alice, "text", b"hello").await.unwrap();

    let secrets = svc.retrieve(&alice).await.unwrap();
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets[0].data, b"hello");

    svc.delete(&alice, &secrets[0].id).await.unwrap();
    assert!(svc.retrieve(&alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn login_token_reaches_the_same_records() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir).await;

    let t1 = svc.register("alice", "pw1").await.unwrap();
    svc.store(&identity(&svc, &t1.token), "card", b"4111 1111 1111 1111")
        .await
        .unwrap();

    let t2 = svc.login("alice", "pw1").await.unwrap();
    let secrets = svc.retrieve(&identity(&svc, &t2.token)).await.unwrap();
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets[0].data, b"4111 1111 1111 1111");
}

// ═══════════════════════════════════════════════════════════════════════
//  Ownership isolation
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn other_users_cannot_see_or_delete() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir).await;

    let a = svc.register("alice", "pw-a").await.unwrap();
    let b = svc.register("bob", "pw-b").await.unwrap();
    let alice = identity(&svc, &a.token);
    let bob = identity(&svc, &b.token);

    let receipt = svc.store(&alice, "password", b"s3cret").await.unwrap();

    assert!(svc.retrieve(&bob).await.unwrap().is_empty());
    svc.delete(&bob, &receipt.id).await.unwrap();

    let remaining = svc.retrieve(&alice).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, receipt.id);
}

// ═══════════════════════════════════════════════════════════════════════
//  Registration race
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_register_yields_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir).await;

    let first = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.register("carol", "pw-1").await })
    };
    let second = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.register("carol", "pw-2").await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let dup = results
        .iter()
        .filter(|r| matches!(r, Err(ServiceError::DuplicateLogin { .. })))
        .count();
    assert_eq!((ok, dup), (1, 1));

    // Exactly one of the two passwords was kept.
    let logins = [
        svc.login("carol", "pw-1").await.is_ok(),
        svc.login("carol", "pw-2").await.is_ok(),
    ];
    assert_eq!(logins.iter().filter(|ok| **ok).count(), 1);
}

#[tokio::test]
async fn key_rotation_makes_retrieve_fail_closed() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&dir).await;
    let t = svc.register("dave", "pw").await.unwrap();
    svc.store(&identity(&svc, &t.token), "binary", &[0, 1, 2, 3])
        .await
        .unwrap();
    drop(svc);

    let db = Database::open_and_migrate(dir.path().join("vault.db"))
        .await
        .unwrap();
    let rotated = VaultService::new(
        Arc::new(SqliteStorage::new(db)),
        Cipher::new(&[0x33; 32]).unwrap(),
        Arc::new(TokenService::new(&[0x22; 48], Duration::hours(24)).unwrap()),
    );

    let dave = identity(&rotated, &t.token);
    assert!(matches!(
        rotated.retrieve(&dave).await,
        Err(ServiceError::Crypto(_))
    ));
    // The stored password envelope no longer opens either.
    assert!(rotated.login("dave", "pw").await.is_err());
}
