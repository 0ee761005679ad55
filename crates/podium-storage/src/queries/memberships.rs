// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time-boxed coach memberships.

use podium_core::types::now_timestamp;
use podium_core::PodiumError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::Membership;

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Membership> {
    Ok(Membership {
        user_id: row.get(0)?,
        coach_id: row.get(1)?,
        transaction_id: row.get(2)?,
        expires_at: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// The membership row if it expires strictly after `now`.
pub fn active_in(
    conn: &rusqlite::Connection,
    user_id: &str,
    coach_id: &str,
    now: &str,
) -> rusqlite::Result<Option<Membership>> {
    conn.query_row(
        "SELECT user_id, coach_id, transaction_id, expires_at, created_at
         FROM memberships WHERE user_id = ?1 AND coach_id = ?2 AND expires_at > ?3",
        params![user_id, coach_id, now],
        map_row,
    )
    .optional()
}

pub async fn active(
    db: &Database,
    user_id: &str,
    coach_id: &str,
    now: &str,
) -> Result<Option<Membership>, PodiumError> {
    let (user_id, coach_id, now) = (user_id.to_string(), coach_id.to_string(), now.to_string());
    db.connection()
        .call(move |conn| active_in(conn, &user_id, &coach_id, &now))
        .await
        .map_err(map_tr_err)
}

/// Insert or renew a membership; a renewal replaces expiry and transaction.
pub fn upsert_in_tx(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    coach_id: &str,
    transaction_id: &str,
    expires_at: &str,
) -> rusqlite::Result<Membership> {
    let created_at = now_timestamp();
    tx.execute(
        "INSERT INTO memberships (user_id, coach_id, transaction_id, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (user_id, coach_id)
         DO UPDATE SET transaction_id = excluded.transaction_id, expires_at = excluded.expires_at",
        params![user_id, coach_id, transaction_id, expires_at, created_at],
    )?;
    tx.query_row(
        "SELECT user_id, coach_id, transaction_id, expires_at, created_at
         FROM memberships WHERE user_id = ?1 AND coach_id = ?2",
        params![user_id, coach_id],
        map_row,
    )
}
