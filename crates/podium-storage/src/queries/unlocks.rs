// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending unlock markers.
//!
//! A marker is written in the same SQL transaction as an unlock debit and
//! removed in the same one as the grant or the compensating credit. One
//! that survives a crash identifies a debit whose content was never granted.

use podium_core::types::now_timestamp;
use podium_core::PodiumError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{PendingUnlock, amount_column, sql_amount};

pub fn insert_marker_in_tx(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    content_id: &str,
    debit_transaction_id: &str,
    amount: u64,
) -> rusqlite::Result<PendingUnlock> {
    let marker = PendingUnlock {
        user_id: user_id.to_string(),
        content_id: content_id.to_string(),
        debit_transaction_id: debit_transaction_id.to_string(),
        amount,
        created_at: now_timestamp(),
    };
    tx.execute(
        "INSERT INTO pending_unlocks (user_id, content_id, debit_transaction_id, amount, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            marker.user_id,
            marker.content_id,
            marker.debit_transaction_id,
            sql_amount(amount)?,
            marker.created_at,
        ],
    )?;
    Ok(marker)
}

/// Remove the marker; returns whether one existed.
pub fn clear_marker_in_tx(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    content_id: &str,
) -> rusqlite::Result<bool> {
    let removed = tx.execute(
        "DELETE FROM pending_unlocks WHERE user_id = ?1 AND content_id = ?2",
        params![user_id, content_id],
    )?;
    Ok(removed > 0)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PendingUnlock> {
    Ok(PendingUnlock {
        user_id: row.get(0)?,
        content_id: row.get(1)?,
        debit_transaction_id: row.get(2)?,
        amount: amount_column(row, 3)?,
        created_at: row.get(4)?,
    })
}

const COLUMNS: &str = "user_id, content_id, debit_transaction_id, amount, created_at";

pub async fn get_marker(
    db: &Database,
    user_id: &str,
    content_id: &str,
) -> Result<Option<PendingUnlock>, PodiumError> {
    let (user_id, content_id) = (user_id.to_string(), content_id.to_string());
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM pending_unlocks WHERE user_id = ?1 AND content_id = ?2"),
                params![user_id, content_id],
                map_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// A user's outstanding markers, oldest first.
pub async fn list_for_user(db: &Database, user_id: &str) -> Result<Vec<PendingUnlock>, PodiumError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM pending_unlocks WHERE user_id = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![user_id], map_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Every outstanding marker, oldest first.
pub async fn list_all(db: &Database) -> Result<Vec<PendingUnlock>, PodiumError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM pending_unlocks ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], map_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use crate::queries::accounts;

    #[tokio::test]
    async fn marker_lifecycle() {
        let db = Database::open_in_memory().await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                accounts::ensure_account_in_tx(&tx, "u1", 30)?;
                let debit = match accounts::apply_debit_in_tx(
                    &tx,
                    "u1",
                    20,
                    TransactionKind::Spent,
                    "content unlock: vid-1",
                )? {
                    Ok(t) => t,
                    Err(_) => return Err(rusqlite::Error::QueryReturnedNoRows),
                };
                insert_marker_in_tx(&tx, "u1", "vid-1", &debit.id, 20)?;
                tx.commit()
            })
            .await
            .unwrap();

        let marker = get_marker(&db, "u1", "vid-1").await.unwrap().unwrap();
        assert_eq!(marker.amount, 20);
        assert_eq!(list_all(&db).await.unwrap().len(), 1);
        assert_eq!(list_for_user(&db, "u1").await.unwrap(), vec![marker]);
        assert!(list_for_user(&db, "u2").await.unwrap().is_empty());

        let cleared = db
            .connection()
            .call(|conn| -> Result<bool, rusqlite::Error> {
                let tx = conn.transaction()?;
                let cleared = clear_marker_in_tx(&tx, "u1", "vid-1")?;
                tx.commit()?;
                Ok(cleared)
            })
            .await
            .unwrap();
        assert!(cleared);
        assert!(get_marker(&db, "u1", "vid-1").await.unwrap().is_none());
    }
}
