//! Account persistence.
//!
//! A user is a unique `login` plus an opaque password blob. The store never
//! interprets the blob; the service layer decides what it contains (an AEAD
//! envelope of the password).
//!
//! Registration runs inside an `IMMEDIATE` transaction, which takes SQLite's
//! writer lock up front and gives serializable isolation. Together with the
//! `PRIMARY KEY` on `login`, two racing registrations for the same login end
//! in exactly one row and one [`StoreError::DuplicateLogin`].

use chrono::Utc;
use rusqlite::{OptionalExtension, TransactionBehavior};
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult, is_unique_violation};

/// CRUD operations on user accounts.
#[derive(Clone)]
pub struct UserStore {
    db: Database,
}

impl UserStore {
    /// Create a new user store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new account inside a serializable transaction.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidArgument`] if `login` or `password` is empty.
    /// - [`StoreError::DuplicateLogin`] if the login is already registered.
    #[instrument(skip(self, password))]
    pub async fn insert(&self, login: &str, password: Vec<u8>) -> StoreResult<()> {
        if login.is_empty() {
            return Err(StoreError::InvalidArgument("login must not be empty".into()));
        }
        if password.is_empty() {
            return Err(StoreError::InvalidArgument(
                "password must not be empty".into(),
            ));
        }

        let login = login.to_string();
        let now = Utc::now().timestamp_millis();

        self.db
            .execute_mut(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO users (login, password, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![login, password, now],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::DuplicateLogin {
                            login: login.clone(),
                        }
                    } else {
                        StoreError::Sqlite(e)
                    }
                })?;
                tx.commit()?;

                debug!(login = %login, "user inserted");
                Ok(())
            })
            .await
    }

    /// Fetch the stored password blob for `login`, or `None` if unknown.
    #[instrument(skip(self))]
    pub async fn find_password(&self, login: &str) -> StoreResult<Option<Vec<u8>>> {
        let login = login.to_string();
        self.db
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT password FROM users WHERE login = ?1",
                        rusqlite::params![login],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await
    }

    /// Total number of registered accounts.
    pub async fn count(&self) -> StoreResult<i64> {
        self.db
            .execute(|conn| Ok(conn.query_row("SELECT count(*) FROM users", [], |row| row.get(0))?))
            .await
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
