// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Podium token ledger engine.
//!
//! - [`LedgerStore`]: balances and the append-only transaction log.
//! - [`EntitlementResolver`]: read-only access decisions.
//! - [`PurchaseOrchestrator`]: content unlocks and coach memberships.
//! - [`PaymentReconciler`]: checkout and exactly-once payment credits.
//! - [`RewardDispatcher`]: engagement rewards and the daily login claim.
//! - [`TokenEngine`]: all of the above behind one handle.

pub mod catalog;
pub mod display;
pub mod engine;
pub mod entitlement;
pub mod ledger;
pub mod locks;
pub mod purchase;
pub mod reconciler;
pub mod rewards;

pub use catalog::StaticCatalog;
pub use display::DisplayedBalances;
pub use engine::TokenEngine;
pub use entitlement::EntitlementResolver;
pub use ledger::{AuditReport, LedgerStore, Posting};
pub use locks::{KeyedGuard, KeyedLocks};
pub use purchase::{
    MembershipReceipt, PurchaseOrchestrator, ROLLBACK_REASON, UnlockOutcome, UnlockReceipt,
};
pub use reconciler::{PURCHASE_REASON, PaymentCredit, PaymentReconciler};
pub use rewards::{RewardDispatcher, RewardSchedule};
