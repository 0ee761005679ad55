// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-content access grants. At most one row per (user, content).

use podium_core::types::now_timestamp;
use podium_core::PodiumError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::Entitlement;
use crate::queries::unlocks;

/// Result of [`grant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// A new row was written for the given transaction.
    Granted(Entitlement),
    /// The user already held an entitlement (possibly from another transaction).
    AlreadyOwned(Entitlement),
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entitlement> {
    Ok(Entitlement {
        user_id: row.get(0)?,
        content_id: row.get(1)?,
        transaction_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Read an entitlement on an open connection.
pub fn get_in(
    conn: &rusqlite::Connection,
    user_id: &str,
    content_id: &str,
) -> rusqlite::Result<Option<Entitlement>> {
    conn.query_row(
        "SELECT user_id, content_id, transaction_id, created_at
         FROM entitlements WHERE user_id = ?1 AND content_id = ?2",
        params![user_id, content_id],
        map_row,
    )
    .optional()
}

pub async fn get(
    db: &Database,
    user_id: &str,
    content_id: &str,
) -> Result<Option<Entitlement>, PodiumError> {
    let (user_id, content_id) = (user_id.to_string(), content_id.to_string());
    db.connection()
        .call(move |conn| get_in(conn, &user_id, &content_id))
        .await
        .map_err(map_tr_err)
}

/// Record that `transaction_id` paid for `content_id`.
///
/// Runs in its own SQL transaction and also clears the user's pending
/// unlock marker for that content. An existing entitlement is left as is.
pub async fn grant(
    db: &Database,
    user_id: &str,
    content_id: &str,
    transaction_id: &str,
) -> Result<GrantOutcome, PodiumError> {
    let (user_id, content_id, transaction_id) = (
        user_id.to_string(),
        content_id.to_string(),
        transaction_id.to_string(),
    );
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            if let Some(existing) = get_in(&tx, &user_id, &content_id)? {
                return Ok(GrantOutcome::AlreadyOwned(existing));
            }
            let entitlement = Entitlement {
                user_id,
                content_id,
                transaction_id,
                created_at: now_timestamp(),
            };
            tx.execute(
                "INSERT INTO entitlements (user_id, content_id, transaction_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    entitlement.user_id,
                    entitlement.content_id,
                    entitlement.transaction_id,
                    entitlement.created_at,
                ],
            )?;
            unlocks::clear_marker_in_tx(&tx, &entitlement.user_id, &entitlement.content_id)?;
            tx.commit()?;
            Ok(GrantOutcome::Granted(entitlement))
        })
        .await
        .map_err(map_tr_err)
}

/// All of a user's entitlements, oldest first.
pub async fn list_for_user(db: &Database, user_id: &str) -> Result<Vec<Entitlement>, PodiumError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, content_id, transaction_id, created_at
                 FROM entitlements WHERE user_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![user_id], map_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use crate::queries::{accounts, transactions};

    async fn debit(db: &Database, user: &'static str) -> String {
        db.connection()
            .call(move |conn| -> Result<String, rusqlite::Error> {
                let tx = conn.transaction()?;
                accounts::ensure_account_in_tx(&tx, user, 0)?;
                let t = accounts::apply_credit_in_tx(&tx, user, 40, TransactionKind::Earned, "seed")?.unwrap();
                tx.commit()?;
                Ok(t.id)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn grant_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        let txn = debit(&db, "u1").await;
        let first = grant(&db, "u1", "vid-1", &txn).await.unwrap();
        assert!(matches!(first, GrantOutcome::Granted(_)));
        let second = grant(&db, "u1", "vid-1", &txn).await.unwrap();
        assert!(matches!(second, GrantOutcome::AlreadyOwned(ref e) if e.transaction_id == txn));
        assert_eq!(list_for_user(&db, "u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn grant_requires_known_transaction() {
        let db = Database::open_in_memory().await.unwrap();
        debit(&db, "u1").await;
        assert!(grant(&db, "u1", "vid-1", "no-such-txn").await.is_err());
        assert!(get(&db, "u1", "vid-1").await.unwrap().is_none());
        assert!(transactions::get(&db, "no-such-txn").await.unwrap().is_none());
    }
}
