// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the ledger's tables.
//!
//! Functions suffixed `_in_tx` take an open `rusqlite::Transaction` so the
//! ledger can compose several of them into one atomic unit; the async ones
//! run a single self-contained statement or transaction on the writer thread.

pub mod accounts;
pub mod entitlements;
pub mod memberships;
pub mod payments;
pub mod rewards;
pub mod transactions;
pub mod unlocks;
