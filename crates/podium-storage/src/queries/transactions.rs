// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only transaction log.

use podium_core::types::now_timestamp;
use podium_core::PodiumError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{Transaction, TransactionKind, parse_column};

const COLUMNS: &str = "seq, id, user_id, signed_amount, kind, reason, created_at";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        seq: row.get(0)?,
        id: row.get(1)?,
        user_id: row.get(2)?,
        signed_amount: row.get(3)?,
        kind: parse_column(row, 4)?,
        reason: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Append one entry inside an open transaction.
///
/// Callers are responsible for moving the cached account fold by the same
/// amount in the same transaction.
pub fn insert_in_tx(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    signed_amount: i64,
    kind: TransactionKind,
    reason: &str,
) -> rusqlite::Result<Transaction> {
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = now_timestamp();
    tx.execute(
        "INSERT INTO transactions (id, user_id, signed_amount, kind, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, user_id, signed_amount, kind.to_string(), reason, created_at],
    )?;
    Ok(Transaction {
        id,
        seq: tx.last_insert_rowid(),
        user_id: user_id.to_string(),
        signed_amount,
        kind,
        reason: reason.to_string(),
        created_at,
    })
}

/// Look up one entry by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Transaction>, PodiumError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM transactions WHERE id = ?1"),
                params![id],
                map_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// A user's history, newest first.
///
/// `before_seq` pages backwards: only entries strictly older than it are returned.
pub async fn list_for_user(
    db: &Database,
    user_id: &str,
    limit: Option<i64>,
    before_seq: Option<i64>,
) -> Result<Vec<Transaction>, PodiumError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM transactions
                 WHERE user_id = ?1 AND seq < ?2
                 ORDER BY seq DESC LIMIT ?3"
            ))?;
            let rows = stmt.query_map(
                params![user_id, before_seq.unwrap_or(i64::MAX), limit.unwrap_or(-1)],
                map_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Every entry for a user in commit order.
pub async fn list_all_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Vec<Transaction>, PodiumError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM transactions WHERE user_id = ?1 ORDER BY seq ASC"
            ))?;
            let rows = stmt.query_map(params![user_id], map_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent entry with `reason` created at or after `since`.
pub fn latest_with_reason_since_in(
    conn: &rusqlite::Connection,
    user_id: &str,
    reason: &str,
    since: &str,
) -> rusqlite::Result<Option<Transaction>> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM transactions
             WHERE user_id = ?1 AND reason = ?2 AND created_at >= ?3
             ORDER BY seq DESC LIMIT 1"
        ),
        params![user_id, reason, since],
        map_row,
    )
    .optional()
}

/// Async wrapper over [`latest_with_reason_since_in`].
pub async fn latest_with_reason_since(
    db: &Database,
    user_id: &str,
    reason: &str,
    since: &str,
) -> Result<Option<Transaction>, PodiumError> {
    let (user_id, reason, since) = (user_id.to_string(), reason.to_string(), since.to_string());
    db.connection()
        .call(move |conn| latest_with_reason_since_in(conn, &user_id, &reason, &since))
        .await
        .map_err(map_tr_err)
}
