// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment session tracking.
//!
//! A session moves `pending -> confirmed` exactly once, in the same SQL
//! transaction as its credit, or `pending -> failed`. Confirmed and failed
//! are terminal.

use podium_core::types::now_timestamp;
use podium_core::PodiumError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Applied, Database, map_tr_err};
use crate::models::{PaymentSession, PaymentStatus, amount_column, parse_column, sql_amount};

const COLUMNS: &str = "session_id, user_id, package_id, tokens_to_credit, status, \
                       credit_transaction_id, created_at, updated_at";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PaymentSession> {
    Ok(PaymentSession {
        session_id: row.get(0)?,
        user_id: row.get(1)?,
        package_id: row.get(2)?,
        tokens_to_credit: amount_column(row, 3)?,
        status: parse_column(row, 4)?,
        credit_transaction_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub async fn insert_session(db: &Database, session: &PaymentSession) -> Result<(), PodiumError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!("INSERT INTO payment_sessions ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    session.session_id,
                    session.user_id,
                    session.package_id,
                    sql_amount(session.tokens_to_credit)?,
                    session.status.to_string(),
                    session.credit_transaction_id,
                    session.created_at,
                    session.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub fn get_session_in(
    conn: &rusqlite::Connection,
    session_id: &str,
) -> rusqlite::Result<Option<PaymentSession>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM payment_sessions WHERE session_id = ?1"),
        params![session_id],
        map_row,
    )
    .optional()
}

pub async fn get_session(
    db: &Database,
    session_id: &str,
) -> Result<Option<PaymentSession>, PodiumError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| get_session_in(conn, &session_id))
        .await
        .map_err(map_tr_err)
}

/// Mark a pending session confirmed by `credit_transaction_id`.
///
/// Fails (as a domain error, rolling the caller's transaction back) when
/// the session is no longer pending.
pub fn confirm_in_tx(
    tx: &rusqlite::Transaction<'_>,
    session_id: &str,
    credit_transaction_id: &str,
) -> Applied<PaymentSession> {
    let updated = tx.execute(
        "UPDATE payment_sessions
         SET status = 'confirmed', credit_transaction_id = ?2, updated_at = ?3
         WHERE session_id = ?1 AND status = 'pending'",
        params![session_id, credit_transaction_id, now_timestamp()],
    )?;
    if updated == 0 {
        return Ok(Err(PodiumError::Internal(format!(
            "payment session {session_id} is no longer pending"
        ))));
    }
    match get_session_in(tx, session_id)? {
        Some(session) => Ok(Ok(session)),
        None => Err(rusqlite::Error::QueryReturnedNoRows),
    }
}

/// Move a pending session to `failed`; returns whether it was pending.
pub async fn mark_failed(db: &Database, session_id: &str) -> Result<bool, PodiumError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE payment_sessions SET status = ?2, updated_at = ?3
                 WHERE session_id = ?1 AND status = 'pending'",
                params![session_id, PaymentStatus::Failed.to_string(), now_timestamp()],
            )?;
            Ok(updated > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// A user's sessions, newest first.
pub async fn list_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Vec<PaymentSession>, PodiumError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM payment_sessions WHERE user_id = ?1
                 ORDER BY created_at DESC"
            ))?;
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
    use crate::queries::accounts;

    fn pending(id: &str) -> PaymentSession {
        let now = now_timestamp();
        PaymentSession {
            session_id: id.to_string(),
            user_id: "u1".to_string(),
            package_id: "pro".to_string(),
            tokens_to_credit: 575,
            status: PaymentStatus::Pending,
            credit_transaction_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    async fn confirm(db: &Database, id: &'static str) -> Result<PaymentSession, PodiumError> {
        db.connection()
            .call(move |conn| -> Applied<PaymentSession> {
                let tx = conn.transaction()?;
                accounts::ensure_account_in_tx(&tx, "u1", 0)?;
                let credit =
                    accounts::apply_credit_in_tx(&tx, "u1", 575, TransactionKind::Purchased, "purchased")?.unwrap();
                let session = match confirm_in_tx(&tx, id, &credit.id)? {
                    Ok(s) => s,
                    Err(e) => return Ok(Err(e)),
                };
                tx.commit()?;
                Ok(Ok(session))
            })
            .await
            .map_err(map_tr_err)?
    }

    #[tokio::test]
    async fn confirm_happens_once() {
        let db = Database::open_in_memory().await.unwrap();
        insert_session(&db, &pending("cs_1")).await.unwrap();

        let confirmed = confirm(&db, "cs_1").await.unwrap();
        assert_eq!(confirmed.status, PaymentStatus::Confirmed);
        assert!(confirmed.credit_transaction_id.is_some());

        assert!(matches!(confirm(&db, "cs_1").await, Err(PodiumError::Internal(_))));
        let balance = accounts::get_balance(&db, "u1").await.unwrap().unwrap();
        assert_eq!(balance.balance, 575);
    }

    #[tokio::test]
    async fn failed_session_cannot_be_confirmed() {
        let db = Database::open_in_memory().await.unwrap();
        insert_session(&db, &pending("cs_2")).await.unwrap();
        assert!(mark_failed(&db, "cs_2").await.unwrap());
        assert!(!mark_failed(&db, "cs_2").await.unwrap());
        assert!(confirm(&db, "cs_2").await.is_err());
        let stored = get_session(&db, "cs_2").await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
        assert_eq!(list_for_user(&db, "u1").await.unwrap().len(), 1);
    }
}
