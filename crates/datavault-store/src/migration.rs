//! Versioned schema migrations.
//!
//! Each migration is a static SQL string keyed by a version number. Applied
//! versions are recorded in `_migrations`, so [`run_all`] is idempotent and
//! safe to call on every startup.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// A single migration definition.
struct Migration {
    /// Strictly increasing version number.
    version: u32,
    /// Human-readable description.
    description: &'static str,
    /// Raw SQL; may hold several `;`-separated statements.
    sql: &'static str,
}

/// All migrations in order. Append new migrations at the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "accounts: users keyed by unique login",
        sql: r#"
            CREATE TABLE users (
                login      TEXT PRIMARY KEY,
                password   BLOB NOT NULL,
                created_at INTEGER NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "secrets: encrypted records owned by a login",
        sql: r#"
            CREATE TABLE secrets (
                id         TEXT PRIMARY KEY,
                owner      TEXT NOT NULL REFERENCES users(login),
                kind       TEXT NOT NULL CHECK(kind IN ('text','password','binary','card')),
                status     TEXT NOT NULL DEFAULT 'NEW',
                data       BLOB NOT NULL,
                created_at INTEGER NOT NULL
            );
            CREATE INDEX idx_secrets_owner ON secrets(owner, created_at);
        "#,
    },
];

/// Apply every migration newer than the recorded schema version.
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    ensure_migrations_table(conn)?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    if pending.is_empty() {
        debug!(current_version = current, "database schema is up to date");
        return Ok(());
    }

    info!(
        current_version = current,
        pending = pending.len(),
        "running pending migrations"
    );

    for migration in pending {
        apply(conn, migration)?;
    }

    info!(
        new_version = latest_version(),
        "all migrations applied"
    );
    Ok(())
}

/// Return the latest applied migration version, or 0 if none.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to read current version: {e}"),
    })
}

/// The version the schema reaches once every migration is applied.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

// ── internals ────────────────────────────────────────────────────────

fn ensure_migrations_table(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  INTEGER NOT NULL
        );",
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to create _migrations table: {e}"),
    })
}

/// Apply one migration and its bookkeeping row atomically.
fn apply(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    info!(
        version = migration.version,
        description = migration.description,
        "applying migration"
    );

    // `Connection::transaction` needs `&mut`, so the transaction is driven by hand.
    conn.execute_batch("BEGIN IMMEDIATE;")
        .map_err(|e| StoreError::Migration {
            version: migration.version,
            message: format!("failed to begin transaction: {e}"),
        })?;

    let result = (|| -> StoreResult<()> {
        conn.execute_batch(migration.sql)
            .map_err(|e| StoreError::Migration {
                version: migration.version,
                message: format!("SQL execution failed: {e}"),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                migration.description,
                chrono::Utc::now().timestamp()
            ],
        )
        .map_err(|e| StoreError::Migration {
            version: migration.version,
            message: format!("failed to record migration: {e}"),
        })?;

        Ok(())
    })();

    match &result {
        Ok(()) => {
            conn.execute_batch("COMMIT;")
                .map_err(|e| StoreError::Migration {
                    version: migration.version,
                    message: format!("failed to commit: {e}"),
                })?;
        }
        Err(err) => {
            warn!(version = migration.version, %err, "migration failed, rolling back");
            let _ = conn.execute_batch("ROLLBACK;");
        }
    }

    result
}

// ── tests ────────────────────────────────────────────────────────────
