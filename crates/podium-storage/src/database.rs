// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread, so a
//! closure passed to [`Database::connection`]`.call()` is never interleaved
//! with another one. Do NOT create additional Connection instances for writes.

use podium_config::model::StorageConfig;
use podium_core::{HealthStatus, PodiumError};
use tracing::{debug, info};

use crate::migrations;

/// Result of a closure run on the writer thread.
///
/// The outer error is a SQL failure; the inner one is a domain outcome
/// (e.g. insufficient balance) that must roll the transaction back
/// without being reported as a storage fault.
pub type Applied<T> = Result<Result<T, PodiumError>, rusqlite::Error>;

/// Convert a tokio-rusqlite error into PodiumError::Storage.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> PodiumError {
    PodiumError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the ledger database.
///
/// Cloning is cheap and every clone shares the same background thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) a WAL-mode database at `path` and migrate it.
    pub async fn open(path: &str) -> Result<Self, PodiumError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| PodiumError::Storage {
                source: Box::new(e),
            })?;
        let db = Self::prepare(conn, true).await?;
        info!(path, "database opened");
        Ok(db)
    }

    /// Open the database described by a storage config section.
    pub async fn open_with(config: &StorageConfig) -> Result<Self, PodiumError> {
        let conn = tokio_rusqlite::Connection::open(&config.database_path)
            .await
            .map_err(|e| PodiumError::Storage {
                source: Box::new(e),
            })?;
        let db = Self::prepare(conn, config.wal_mode).await?;
        info!(path = %config.database_path, wal = config.wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database (tests and dry runs).
    pub async fn open_in_memory() -> Result<Self, PodiumError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| PodiumError::Storage {
                source: Box::new(e),
            })?;
        Self::prepare(conn, false).await
    }

    async fn prepare(conn: tokio_rusqlite::Connection, wal: bool) -> Result<Self, PodiumError> {
        conn.call(move |conn| -> Applied<()> {
            if wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;
        debug!("migrations applied");
        Ok(Self { conn })
    }

    /// The shared tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Cheap liveness probe.
    pub async fn health_check(&self) -> Result<HealthStatus, PodiumError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), PodiumError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        for expected in [
            "accounts",
            "entitlements",
            "memberships",
            "payment_sessions",
            "pending_unlocks",
            "reward_claims",
            "transactions",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert_eq!(db.health_check().await.unwrap(), HealthStatus::Healthy);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn negative_balance_is_rejected_by_schema() {
        let db = Database::open_in_memory().await.unwrap();
        let result = db
            .connection()
            .call(|conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO accounts (user_id, balance, total_earned, total_spent, created_at, updated_at)
                     VALUES ('u1', -1, 0, 1, 'x', 'x')",
                    [],
                )
            })
            .await;
        assert!(result.is_err());
    }
}
