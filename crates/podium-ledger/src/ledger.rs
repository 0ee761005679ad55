// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Ledger Store: the only component that moves balances.
//!
//! Every mutation appends a transaction and updates the cached account fold
//! inside one SQLite transaction, under a per-user lock. The `*_with`
//! variants let a caller attach further writes (an unlock marker, a session
//! confirmation) that commit or roll back together with the balance change.
//!
//! Mutations are not cancellable: once the closure reaches the writer
//! thread it runs to commit or rollback even if the caller's future is dropped.

use podium_config::model::LedgerConfig;
use podium_core::{AccountBalance, PodiumError, Transaction, TransactionKind};
use podium_storage::queries::{accounts, transactions, unlocks};
use podium_storage::{Applied, Database, PendingUnlock, map_tr_err};
use tracing::{debug, info, warn};

use crate::locks::KeyedLocks;

/// A committed balance change, the account afterwards, and whatever the
/// attached side effect produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting<T = ()> {
    pub transaction: Transaction,
    pub balance: AccountBalance,
    pub output: T,
}

/// Cached fold compared against a fresh fold of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    pub cached: Option<AccountBalance>,
    pub folded: AccountBalance,
    pub transaction_count: usize,
    /// Unlock debits whose content was neither granted nor refunded.
    ///
    /// May include an unlock still in flight when the audit ran.
    pub stranded_unlocks: Vec<PendingUnlock>,
}

impl AuditReport {
    /// Whether the cached row matches the log.
    pub fn is_consistent(&self) -> bool {
        match &self.cached {
            Some(cached) => cached == &self.folded && cached.is_consistent(),
            None => self.transaction_count == 0,
        }
    }

    /// Whether anything here needs manual reconciliation.
    pub fn needs_attention(&self) -> bool {
        !self.is_consistent() || !self.stranded_unlocks.is_empty()
    }
}

pub struct LedgerStore {
    db: Database,
    locks: KeyedLocks,
    welcome_bonus: u64,
}

impl LedgerStore {
    pub fn new(db: Database, welcome_bonus: u64) -> Self {
        Self {
            db,
            locks: KeyedLocks::new(),
            welcome_bonus,
        }
    }

    pub fn from_config(db: Database, config: &LedgerConfig) -> Self {
        Self::new(db, config.welcome_bonus)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn welcome_bonus(&self) -> u64 {
        self.welcome_bonus
    }

    /// Create the account if needed. Idempotent: the welcome bonus is
    /// credited only by the call that actually creates the row.
    pub async fn ensure_account(&self, user_id: &str) -> Result<Option<Transaction>, PodiumError> {
        let created = self.apply(user_id, |_| Ok(Ok(()))).await?;
        if let Some(bonus) = &created.0 {
            info!(
                user_id,
                amount = self.welcome_bonus,
                transaction_id = %bonus.id,
                "welcome bonus credited"
            );
        }
        Ok(created.0)
    }

    /// The user's balance, creating the account on first sight.
    pub async fn get_balance(&self, user_id: &str) -> Result<AccountBalance, PodiumError> {
        if let Some(balance) = accounts::get_balance(&self.db, user_id).await? {
            debug!(user_id, balance = balance.balance, "balance read");
            return Ok(balance);
        }
        self.ensure_account(user_id).await?;
        accounts::get_balance(&self.db, user_id)
            .await?
            .ok_or_else(|| PodiumError::Internal(format!("account {user_id} vanished after creation")))
    }

    pub async fn credit(
        &self,
        user_id: &str,
        amount: u64,
        kind: TransactionKind,
        reason: &str,
    ) -> Result<Transaction, PodiumError> {
        self.credit_with(user_id, amount, kind, reason, |_, _| Ok(Ok(())))
            .await
            .map(|posting| posting.transaction)
    }

    /// Credit `amount` and run `also` in the same SQLite transaction.
    ///
    /// If `also` returns an error the credit is rolled back.
    pub async fn credit_with<T, F>(
        &self,
        user_id: &str,
        amount: u64,
        kind: TransactionKind,
        reason: &str,
        also: F,
    ) -> Result<Posting<T>, PodiumError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Transaction<'_>, &Transaction) -> Applied<T> + Send + 'static,
    {
        if amount == 0 {
            return Err(PodiumError::InvalidAmount(amount));
        }
        let user = user_id.to_string();
        let reason_owned = reason.to_string();
        let (_, posting) = self
            .apply(user_id, move |tx| {
                let transaction =
                    match accounts::apply_credit_in_tx(tx, &user, amount, kind, &reason_owned)? {
                        Ok(transaction) => transaction,
                        Err(e) => return Ok(Err(e)),
                    };
                finish(tx, &user, transaction, also)
            })
            .await?;
        info!(
            user_id,
            amount,
            %kind,
            reason,
            transaction_id = %posting.transaction.id,
            balance = posting.balance.balance,
            "ledger credit"
        );
        Ok(posting)
    }

    pub async fn debit(
        &self,
        user_id: &str,
        amount: u64,
        kind: TransactionKind,
        reason: &str,
    ) -> Result<Transaction, PodiumError> {
        self.debit_with(user_id, amount, kind, reason, |_, _| Ok(Ok(())))
            .await
            .map(|posting| posting.transaction)
    }

    /// Debit `amount` and run `also` in the same SQLite transaction.
    ///
    /// Fails with [`PodiumError::InsufficientBalance`] without writing
    /// anything when the balance does not cover `amount`.
    pub async fn debit_with<T, F>(
        &self,
        user_id: &str,
        amount: u64,
        kind: TransactionKind,
        reason: &str,
        also: F,
    ) -> Result<Posting<T>, PodiumError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Transaction<'_>, &Transaction) -> Applied<T> + Send + 'static,
    {
        if amount == 0 {
            return Err(PodiumError::InvalidAmount(amount));
        }
        let user = user_id.to_string();
        let reason_owned = reason.to_string();
        let result = self
            .apply(user_id, move |tx| {
                let transaction =
                    match accounts::apply_debit_in_tx(tx, &user, amount, kind, &reason_owned)? {
                        Ok(transaction) => transaction,
                        Err(e) => return Ok(Err(e)),
                    };
                finish(tx, &user, transaction, also)
            })
            .await;
        match result {
            Ok((_, posting)) => {
                info!(
                    user_id,
                    amount,
                    %kind,
                    reason,
                    transaction_id = %posting.transaction.id,
                    balance = posting.balance.balance,
                    "ledger debit"
                );
                Ok(posting)
            }
            Err(PodiumError::InsufficientBalance {
                required,
                available,
            }) => {
                warn!(user_id, required, available, reason, "insufficient balance");
                Err(PodiumError::InsufficientBalance {
                    required,
                    available,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Transactions newest first, at most `limit` of them.
    pub async fn history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, PodiumError> {
        transactions::list_for_user(&self.db, user_id, limit.map(clamp_limit), None).await
    }

    /// Continue a [`history`](Self::history) listing after the entry with `before_seq`.
    pub async fn history_before(
        &self,
        user_id: &str,
        before_seq: i64,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, PodiumError> {
        transactions::list_for_user(&self.db, user_id, limit.map(clamp_limit), Some(before_seq))
            .await
    }

    /// Re-fold the user's log and compare it with the cached account row.
    pub async fn audit(&self, user_id: &str) -> Result<AuditReport, PodiumError> {
        let _guard = self.locks.lock(user_id).await;
        let log = transactions::list_all_for_user(&self.db, user_id).await?;
        let cached = accounts::get_balance(&self.db, user_id).await?;
        let stranded_unlocks = unlocks::list_for_user(&self.db, user_id).await?;
        let report = AuditReport {
            folded: AccountBalance::from_transactions(user_id, &log),
            cached,
            transaction_count: log.len(),
            stranded_unlocks,
        };
        if !report.is_consistent() {
            warn!(user_id, ?report, "cached balance disagrees with transaction log");
        }
        for marker in &report.stranded_unlocks {
            warn!(
                user_id,
                content_id = %marker.content_id,
                debit_transaction_id = %marker.debit_transaction_id,
                amount = marker.amount,
                "unlock debit without grant or refund"
            );
        }
        Ok(report)
    }

    /// Run `f` under the user's lock in one SQLite transaction that first
    /// makes sure the account exists.
    async fn apply<T, F>(&self, user_id: &str, f: F) -> Result<(Option<Transaction>, T), PodiumError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Transaction<'_>) -> Applied<T> + Send + 'static,
    {
        let _guard = self.locks.lock(user_id).await;
        let user = user_id.to_string();
        let bonus = self.welcome_bonus;
        self.db
            .connection()
            .call(move |conn| -> Applied<(Option<Transaction>, T)> {
                let tx = conn.transaction()?;
                let created = accounts::ensure_account_in_tx(&tx, &user, bonus)?;
                let out = match f(&tx)? {
                    Ok(out) => out,
                    Err(e) => return Ok(Err(e)),
                };
                tx.commit()?;
                Ok(Ok((created, out)))
            })
            .await
            .map_err(map_tr_err)?
    }
}

fn finish<T, F>(
    tx: &rusqlite::Transaction<'_>,
    user_id: &str,
    transaction: Transaction,
    also: F,
) -> Applied<Posting<T>>
where
    F: FnOnce(&rusqlite::Transaction<'_>, &Transaction) -> Applied<T>,
{
    let output = match also(tx, &transaction)? {
        Ok(output) => output,
        Err(e) => return Ok(Err(e)),
    };
    let balance = accounts::load_in(tx, user_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    Ok(Ok(Posting {
        transaction,
        balance,
        output,
    }))
}

fn clamp_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
