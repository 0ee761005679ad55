// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the ledger, storage, and adapter crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Timestamp format used for every persisted `created_at` / `updated_at`.
///
/// Fixed width, so lexicographic order equals chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format a UTC instant in the persisted timestamp format.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// The current instant in the persisted timestamp format.
pub fn now_timestamp() -> String {
    timestamp(Utc::now())
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    PaymentProcessor,
    Catalog,
}

/// Cause category of a ledger transaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Rewards, bonuses, and rollbacks.
    Earned,
    /// Unlocks and memberships.
    Spent,
    /// Tokens bought through the payment processor.
    Purchased,
}

/// An immutable ledger entry. Positive amounts are credits, negative debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier (UUID v4).
    pub id: String,
    /// Monotonic insertion sequence; orders history and pages it.
    pub seq: i64,
    pub user_id: String,
    pub signed_amount: i64,
    pub kind: TransactionKind,
    /// Free-text cause, e.g. "daily login" or "content unlock: vid-1".
    pub reason: String,
    pub created_at: String,
}

/// Cached fold of a user's transaction log.
///
/// Invariant: `balance == total_earned - total_spent`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub user_id: String,
    pub balance: u64,
    pub total_earned: u64,
    pub total_spent: u64,
    /// Sequence number of the newest transaction folded in; 0 for an empty log.
    #[serde(default)]
    pub last_seq: i64,
}

impl AccountBalance {
    /// Derive a balance by folding a transaction log in any order.
    pub fn from_transactions<'a>(
        user_id: &str,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Self {
        let mut earned: u64 = 0;
        let mut spent: u64 = 0;
        let mut last_seq: i64 = 0;
        for tx in transactions {
            last_seq = last_seq.max(tx.seq);
            if tx.signed_amount >= 0 {
                earned += tx.signed_amount.unsigned_abs();
            } else {
                spent += tx.signed_amount.unsigned_abs();
            }
        }
        Self {
            user_id: user_id.to_string(),
            balance: earned.saturating_sub(spent),
            total_earned: earned,
            total_spent: spent,
            last_seq,
        }
    }

    /// Whether the cached counters agree with each other.
    pub fn is_consistent(&self) -> bool {
        self.total_earned.checked_sub(self.total_spent) == Some(self.balance)
    }
}

/// Ownership of one premium item by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub user_id: String,
    pub content_id: String,
    /// The debit that paid for this entitlement.
    pub transaction_id: String,
    pub created_at: String,
}

/// Time-bounded access to all premium content of one coach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: String,
    pub coach_id: String,
    pub transaction_id: String,
    pub expires_at: String,
    pub created_at: String,
}

/// Lifecycle state of a payment-processor checkout session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed,
}

/// A checkout opened at the payment processor, tracked locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Identifier assigned by the payment processor.
    pub session_id: String,
    pub user_id: String,
    pub package_id: String,
    pub tokens_to_credit: u64,
    pub status: PaymentStatus,
    /// Set once the session is confirmed and credited.
    pub credit_transaction_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Catalog entry for a purchasable bundle of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPackage {
    pub id: String,
    pub tokens: u64,
    pub bonus_tokens: u64,
    /// Price in the smallest currency unit.
    pub price_cents: u64,
    pub label: String,
}

impl TokenPackage {
    /// Tokens credited when this package is paid for.
    pub fn total_tokens(&self) -> u64 {
        self.tokens + self.bonus_tokens
    }
}

/// What kind of premium item a piece of content is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Livestream,
    Post,
}

/// A piece of content as the ledger sees it: an id, a price, an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumContent {
    pub id: String,
    pub kind: ContentKind,
    /// Token price; zero means free.
    pub cost: u64,
    /// Coach whose membership also unlocks this content.
    pub coach_id: Option<String>,
}

impl PremiumContent {
    pub fn is_free(&self) -> bool {
        self.cost == 0
    }
}

/// A coach membership offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipPlan {
    pub coach_id: String,
    pub cost: u64,
    pub duration_days: u32,
}

/// Roles supplied by the identity provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Moderator,
    Administrator,
}

impl Capability {
    /// Whether this role may view any premium content for review.
    pub fn grants_premium_bypass(self) -> bool {
        matches!(self, Capability::Moderator | Capability::Administrator)
    }
}

/// An authenticated caller, resolved outside the ledger and trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl Identity {
    /// An identity with no special capabilities.
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    pub fn has_premium_bypass(&self) -> bool {
        self.capabilities.iter().any(|c| c.grants_premium_bypass())
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The content has no cost.
    Free,
    /// An entitlement already exists for this user and content.
    Owned,
    /// An active coach membership covers this content.
    Member { coach_id: String, expires_at: String },
    /// A reviewer role grants access without tokens or records.
    PrivilegedBypass,
    /// The user must spend `cost` tokens to unlock.
    RequiresUnlock { cost: u64 },
}

impl Decision {
    /// Whether the caller may view the content right now.
    pub fn grants_access(&self) -> bool {
        !matches!(self, Decision::RequiresUnlock { .. })
    }
}

/// Engagement events that earn tokens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RewardEvent {
    Watch,
    Like,
    Referral,
    DailyLogin,
    CheckIn,
    SafetyReport,
}

impl RewardEvent {
    /// Transaction reason recorded for this event.
    pub fn reason(self) -> &'static str {
        match self {
            RewardEvent::Watch => "watch",
            RewardEvent::Like => "like",
            RewardEvent::Referral => "referral",
            RewardEvent::DailyLogin => "daily login",
            RewardEvent::CheckIn => "check-in",
            RewardEvent::SafetyReport => "safety report",
        }
    }
}

/// What the payment processor returns when a checkout is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    /// Where the client should be sent to pay.
    pub redirect_url: String,
}

/// The processor's view of a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorVerdict {
    Paid,
    Unpaid,
    Expired,
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn tx(amount: i64) -> Transaction {
        Transaction {
            id: format!("t{amount}"),
            seq: 0,
            user_id: "u1".into(),
            signed_amount: amount,
            kind: if amount >= 0 {
                TransactionKind::Earned
            } else {
                TransactionKind::Spent
            },
            reason: "test".into(),
            created_at: now_timestamp(),
        }
    }

    #[test]
    fn fold_splits_credits_and_debits() {
        let log = vec![tx(100), tx(-20), tx(5)];
        let balance = AccountBalance::from_transactions("u1", &log);
        assert_eq!(balance.balance, 85);
        assert_eq!(balance.total_earned, 105);
        assert_eq!(balance.total_spent, 20);
        assert!(balance.is_consistent());
    }

    #[test]
    fn enum_string_forms() {
        assert_eq!(TransactionKind::Purchased.to_string(), "purchased");
        assert_eq!(
            RewardEvent::from_str("daily_login").unwrap(),
            RewardEvent::DailyLogin
        );
        assert_eq!(RewardEvent::DailyLogin.reason(), "daily login");
        assert_eq!(PaymentStatus::from_str("confirmed").unwrap(), PaymentStatus::Confirmed);
        assert_eq!(Capability::from_str("moderator").unwrap(), Capability::Moderator);
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_string(&Decision::RequiresUnlock { cost: 20 }).unwrap();
        assert_eq!(json, r#"{"decision":"requires_unlock","cost":20}"#);
        assert!(!Decision::RequiresUnlock { cost: 20 }.grants_access());
        assert!(Decision::PrivilegedBypass.grants_access());
    }

    #[test]
    fn identity_bypass_requires_role() {
        assert!(!Identity::user("u1").has_premium_bypass());
        assert!(
            Identity::user("u1")
                .with_capability(Capability::Moderator)
                .has_premium_bypass()
        );
    }

    #[test]
    fn timestamps_sort_chronologically() {
        let earlier = timestamp(Utc::now() - chrono::Duration::hours(25));
        assert!(earlier < now_timestamp());
    }

    proptest! {
        #[test]
        fn fold_is_consistent_when_debits_never_overdraw(amounts in proptest::collection::vec(-50i64..100, 0..40)) {
            let mut log = Vec::new();
            let mut running: i64 = 0;
            for amount in amounts {
                if running + amount >= 0 {
                    running += amount;
                    log.push(tx(amount));
                }
            }
            let balance = AccountBalance::from_transactions("u1", &log);
            prop_assert!(balance.is_consistent());
            prop_assert_eq!(balance.balance as i64, running);
        }
    }
}
