// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Balances as shown to a client, ahead of the ledger.
//!
//! A client may apply a debit or credit locally before the authoritative
//! call returns. Those deltas live here, on top of the last balance read
//! from the ledger, and are discarded whenever a fresh authoritative value
//! arrives. Nothing in the ledger reads from this layer.

use dashmap::DashMap;
use podium_core::AccountBalance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Displayed {
    authoritative: u64,
    /// `last_seq` of the balance `authoritative` came from.
    seq: i64,
    pending: i64,
}

#[derive(Debug, Default)]
pub struct DisplayedBalances {
    entries: DashMap<String, Displayed>,
}

impl DisplayedBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the user's displayed value with the ledger's and drop pending deltas.
    ///
    /// A balance older than the one already shown is ignored, so reads that
    /// finish out of order never roll the display back.
    pub fn reconcile(&self, balance: &AccountBalance) {
        let fresh = Displayed {
            authoritative: balance.balance,
            seq: balance.last_seq,
            pending: 0,
        };
        self.entries
            .entry(balance.user_id.clone())
            .and_modify(|shown| {
                if shown.seq <= fresh.seq {
                    *shown = fresh;
                }
            })
            .or_insert(fresh);
    }

    pub fn optimistic_debit(&self, user_id: &str, amount: u64) {
        self.adjust(user_id, -saturating_i64(amount));
    }

    pub fn optimistic_credit(&self, user_id: &str, amount: u64) {
        self.adjust(user_id, saturating_i64(amount));
    }

    fn adjust(&self, user_id: &str, delta: i64) {
        let mut entry = self
            .entries
            .entry(user_id.to_string())
            .or_insert(Displayed {
                authoritative: 0,
                seq: 0,
                pending: 0,
            });
        entry.pending = entry.pending.saturating_add(delta);
    }

    /// The value to render, never below zero. `None` before the first read.
    pub fn shown(&self, user_id: &str) -> Option<u64> {
        self.entries.get(user_id).map(|d| {
            let shown = i128::from(d.authoritative) + i128::from(d.pending);
            u64::try_from(shown.max(0)).unwrap_or(u64::MAX)
        })
    }

    pub fn forget(&self, user_id: &str) {
        self.entries.remove(user_id);
    }
}

fn saturating_i64(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(user: &str, balance: u64) -> AccountBalance {
        at_seq(user, balance, 1)
    }

    fn at_seq(user: &str, balance: u64, last_seq: i64) -> AccountBalance {
        AccountBalance {
            user_id: user.to_string(),
            balance,
            total_earned: balance,
            total_spent: 0,
            last_seq,
        }
    }

    #[test]
    fn optimistic_changes_are_replaced_by_reconcile() {
        let display = DisplayedBalances::new();
        assert_eq!(display.shown("u1"), None);
        display.reconcile(&balance("u1", 50));
        display.optimistic_debit("u1", 20);
        assert_eq!(display.shown("u1"), Some(30));
        display.reconcile(&balance("u1", 50));
        assert_eq!(display.shown("u1"), Some(50));
    }

    #[test]
    fn shown_never_negative() {
        let display = DisplayedBalances::new();
        display.reconcile(&balance("u1", 5));
        display.optimistic_debit("u1", 20);
        assert_eq!(display.shown("u1"), Some(0));
        display.optimistic_credit("u1", 100);
        assert_eq!(display.shown("u1"), Some(85));
    }

    #[test]
    fn older_balance_does_not_replace_newer() {
        let display = DisplayedBalances::new();
        display.reconcile(&at_seq("u1", 30, 7));
        display.reconcile(&at_seq("u1", 50, 5));
        assert_eq!(display.shown("u1"), Some(30));
        display.reconcile(&at_seq("u1", 35, 8));
        assert_eq!(display.shown("u1"), Some(35));
    }
}
