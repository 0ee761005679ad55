// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-local row types and row mapping helpers.
//!
//! Domain types shared across crates live in `podium-core::types` and are
//! re-exported here for convenience within the storage crate.

use std::str::FromStr;

pub use podium_core::types::{
    AccountBalance, Entitlement, Membership, PaymentSession, PaymentStatus, Transaction,
    TransactionKind,
};

/// Marker left by an unlock whose debit committed but whose grant has not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUnlock {
    pub user_id: String,
    pub content_id: String,
    pub debit_transaction_id: String,
    pub amount: u64,
    pub created_at: String,
}

/// Read a text column through `FromStr` (strum enums).
pub(crate) fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Read a non-negative integer column as `u64`.
pub(crate) fn amount_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Integer, Box::new(e))
    })
}

/// Convert a token amount into the SQLite integer domain.
pub(crate) fn sql_amount(amount: u64) -> rusqlite::Result<i64> {
    i64::try_from(amount).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
