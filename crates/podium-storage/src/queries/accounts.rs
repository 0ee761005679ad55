// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account rows: the cached fold of each user's transaction log.
//!
//! Every balance change goes through [`apply_credit_in_tx`] or
//! [`apply_debit_in_tx`], which append the log entry and move the fold in
//! the same SQL transaction. Nothing else writes these columns.

use podium_core::types::now_timestamp;
use podium_core::PodiumError;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use crate::database::{Applied, Database, map_tr_err};
use crate::models::{AccountBalance, Transaction, TransactionKind, amount_column, sql_amount};
use crate::queries::transactions;

/// Reason recorded on the one-time opening credit.
pub const WELCOME_BONUS_REASON: &str = "welcome bonus";

/// Create the account row if it does not exist yet.
///
/// A newly created account receives `welcome_bonus` tokens as its first
/// transaction; returns that transaction, or `None` when the account
/// already existed or the bonus is zero.
pub fn ensure_account_in_tx(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    welcome_bonus: u64,
) -> rusqlite::Result<Option<Transaction>> {
    let now = now_timestamp();
    let created = tx.execute(
        "INSERT OR IGNORE INTO accounts (user_id, balance, total_earned, total_spent, created_at, updated_at)
         VALUES (?1, 0, 0, 0, ?2, ?2)",
        params![user_id, now],
    )?;
    if created == 0 || welcome_bonus == 0 {
        return Ok(None);
    }
    debug!(user_id, welcome_bonus, "account created");
    append_credit(
        tx,
        user_id,
        sql_amount(welcome_bonus)?,
        TransactionKind::Earned,
        WELCOME_BONUS_REASON,
    )
    .map(Some)
}

/// Append a credit and grow the fold.
///
/// A credit that would push the totals past what SQLite stores as an
/// integer is refused with [`PodiumError::InvalidAmount`] before anything
/// is written.
pub fn apply_credit_in_tx(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    amount: u64,
    kind: TransactionKind,
    reason: &str,
) -> Applied<Transaction> {
    let current = load_in(tx, user_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    // total_earned bounds balance.
    let fits = current
        .total_earned
        .checked_add(amount)
        .is_some_and(|total| total <= i64::MAX.unsigned_abs());
    if !fits {
        return Ok(Err(PodiumError::InvalidAmount(amount)));
    }
    append_credit(tx, user_id, sql_amount(amount)?, kind, reason).map(Ok)
}

fn append_credit(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    delta: i64,
    kind: TransactionKind,
    reason: &str,
) -> rusqlite::Result<Transaction> {
    let updated = tx.execute(
        "UPDATE accounts
         SET balance = balance + ?2, total_earned = total_earned + ?2, updated_at = ?3
         WHERE user_id = ?1",
        params![user_id, delta, now_timestamp()],
    )?;
    if updated == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }
    transactions::insert_in_tx(tx, user_id, delta, kind, reason)
}

/// Append a debit and shrink the fold, refusing to go below zero.
///
/// A short balance is a domain outcome: the inner error is
/// [`PodiumError::InsufficientBalance`] and nothing has been written.
pub fn apply_debit_in_tx(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    amount: u64,
    kind: TransactionKind,
    reason: &str,
) -> Applied<Transaction> {
    let available = load_in(tx, user_id)?.map_or(0, |a| a.balance);
    if available < amount {
        return Ok(Err(PodiumError::InsufficientBalance {
            required: amount,
            available,
        }));
    }
    let delta = sql_amount(amount)?;
    tx.execute(
        "UPDATE accounts
         SET balance = balance - ?2, total_spent = total_spent + ?2, updated_at = ?3
         WHERE user_id = ?1",
        params![user_id, delta, now_timestamp()],
    )?;
    transactions::insert_in_tx(tx, user_id, -delta, kind, reason).map(Ok)
}

/// Read the cached fold on an open connection.
pub fn load_in(
    conn: &rusqlite::Connection,
    user_id: &str,
) -> rusqlite::Result<Option<AccountBalance>> {
    conn.query_row(
        "SELECT user_id, balance, total_earned, total_spent,
                COALESCE((SELECT MAX(seq) FROM transactions WHERE user_id = accounts.user_id), 0)
         FROM accounts WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(AccountBalance {
                user_id: row.get(0)?,
                balance: amount_column(row, 1)?,
                total_earned: amount_column(row, 2)?,
                total_spent: amount_column(row, 3)?,
                last_seq: row.get(4)?,
            })
        },
    )
    .optional()
}

/// The cached fold for a user, if the account exists.
pub async fn get_balance(
    db: &Database,
    user_id: &str,
) -> Result<Option<AccountBalance>, PodiumError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| load_in(conn, &user_id))
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run<T: Send + 'static>(
        db: &Database,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> Applied<T> + Send + 'static,
    ) -> Result<T, PodiumError> {
        db.connection()
            .call(move |conn| -> Applied<T> {
                let tx = conn.transaction()?;
                let out = match f(&tx)? {
                    Ok(out) => out,
                    Err(e) => return Ok(Err(e)),
                };
                tx.commit()?;
                Ok(Ok(out))
            })
            .await
            .map_err(map_tr_err)?
    }

    #[tokio::test]
    async fn ensure_account_credits_bonus_once() {
        let db = Database::open_in_memory().await.unwrap();
        let first = run(&db, |tx| ensure_account_in_tx(tx, "u1", 100).map(Ok))
            .await
            .unwrap();
        assert_eq!(first.unwrap().signed_amount, 100);
        let second = run(&db, |tx| ensure_account_in_tx(tx, "u1", 100).map(Ok))
            .await
            .unwrap();
        assert!(second.is_none());

        let balance = get_balance(&db, "u1").await.unwrap().unwrap();
        assert_eq!(balance.balance, 100);
        assert_eq!(balance.total_earned, 100);
        assert!(balance.is_consistent());
    }

    #[tokio::test]
    async fn zero_bonus_creates_empty_account() {
        let db = Database::open_in_memory().await.unwrap();
        let bonus = run(&db, |tx| ensure_account_in_tx(tx, "u1", 0).map(Ok))
            .await
            .unwrap();
        assert!(bonus.is_none());
        assert_eq!(get_balance(&db, "u1").await.unwrap().unwrap().balance, 0);
    }

    #[tokio::test]
    async fn short_debit_writes_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        run(&db, |tx| ensure_account_in_tx(tx, "u1", 5).map(Ok))
            .await
            .unwrap();
        let err = run(&db, |tx| {
            apply_debit_in_tx(tx, "u1", 20, TransactionKind::Spent, "content unlock: vid-1")
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            PodiumError::InsufficientBalance {
                required: 20,
                available: 5
            }
        ));
        let balance = get_balance(&db, "u1").await.unwrap().unwrap();
        assert_eq!((balance.balance, balance.total_spent), (5, 0));
        assert_eq!(
            transactions::list_all_for_user(&db, "u1").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn debit_moves_fold() {
        let db = Database::open_in_memory().await.unwrap();
        run(&db, |tx| ensure_account_in_tx(tx, "u1", 50).map(Ok))
            .await
            .unwrap();
        let txn = run(&db, |tx| {
            apply_debit_in_tx(tx, "u1", 20, TransactionKind::Spent, "content unlock: vid-1")
        })
        .await
        .unwrap();
        assert_eq!(txn.signed_amount, -20);
        assert_eq!(txn.kind, TransactionKind::Spent);
        let balance = get_balance(&db, "u1").await.unwrap().unwrap();
        assert_eq!(
            (balance.balance, balance.total_earned, balance.total_spent),
            (30, 50, 20)
        );
    }

    #[tokio::test]
    async fn credit_to_unknown_account_fails() {
        let db = Database::open_in_memory().await.unwrap();
        let result = run(&db, |tx| {
            apply_credit_in_tx(tx, "ghost", 5, TransactionKind::Earned, "watch")
        })
        .await;
        assert!(matches!(result, Err(PodiumError::Storage { .. })));
    }

    #[tokio::test]
    async fn credit_past_integer_range_is_refused() {
        let db = Database::open_in_memory().await.unwrap();
        let near_max = i64::MAX.unsigned_abs() - 10;
        run(&db, move |tx| {
            ensure_account_in_tx(tx, "u1", 0)?;
            apply_credit_in_tx(tx, "u1", near_max, TransactionKind::Purchased, "purchased")
        })
        .await
        .unwrap();

        let err = run(&db, |tx| {
            apply_credit_in_tx(tx, "u1", 100, TransactionKind::Earned, "watch")
        })
        .await
        .unwrap_err();
        assert!(matches!(err, PodiumError::InvalidAmount(100)));

        let balance = get_balance(&db, "u1").await.unwrap().unwrap();
        assert_eq!(balance.balance, near_max);
        assert_eq!(
            transactions::list_all_for_user(&db, "u1").await.unwrap().len(),
            1
        );
    }
}
