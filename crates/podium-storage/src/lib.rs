// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Podium token ledger.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed queries for accounts,
//! transactions, entitlements, memberships, unlock markers, payment
//! sessions, and reward claims.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::{Applied, Database, map_tr_err};
pub use models::*;
