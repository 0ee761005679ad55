// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-content reward claims, used when content rewards are deduplicated.

use podium_core::types::now_timestamp;
use podium_core::PodiumError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

pub fn has_claim_in(
    conn: &rusqlite::Connection,
    user_id: &str,
    content_id: &str,
    event: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM reward_claims WHERE user_id = ?1 AND content_id = ?2 AND event = ?3",
        params![user_id, content_id, event],
        |_| Ok(()),
    )
    .optional()
    .map(|hit| hit.is_some())
}

pub async fn has_claim(
    db: &Database,
    user_id: &str,
    content_id: &str,
    event: &str,
) -> Result<bool, PodiumError> {
    let (user_id, content_id, event) =
        (user_id.to_string(), content_id.to_string(), event.to_string());
    db.connection()
        .call(move |conn| has_claim_in(conn, &user_id, &content_id, &event))
        .await
        .map_err(map_tr_err)
}

pub fn insert_claim_in_tx(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    content_id: &str,
    event: &str,
    transaction_id: &str,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO reward_claims (user_id, content_id, event, transaction_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, content_id, event, transaction_id, now_timestamp()],
    )?;
    Ok(())
}
