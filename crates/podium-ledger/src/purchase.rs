// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The unlock flow: check, reserve, grant, confirm.
//!
//! The debit and a pending-unlock marker commit together; the grant and
//! the marker's removal commit together. When the grant fails the debit is
//! reversed by an "unlock rollback" credit that also removes the marker.
//! A marker found on entry belongs to an earlier attempt that was cut off
//! between debit and grant, and that attempt is completed instead of
//! charging again.

use std::sync::Arc;

use chrono::{Duration, Utc};
use podium_core::types::{now_timestamp, timestamp};
use podium_core::{
    Decision, Entitlement, Identity, Membership, MembershipPlan, PodiumError, PremiumContent,
    TransactionKind,
};
use podium_storage::queries::entitlements::{self, GrantOutcome};
use podium_storage::queries::{memberships, unlocks};
use podium_storage::{Database, PendingUnlock};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::entitlement::EntitlementResolver;
use crate::ledger::LedgerStore;
use crate::locks::{KeyedLocks, compound_key};

/// Reason recorded on the credit that reverses a failed unlock.
pub const ROLLBACK_REASON: &str = "unlock rollback";

/// Reason recorded on an unlock debit.
pub fn unlock_reason(content_id: &str) -> String {
    format!("content unlock: {content_id}")
}

/// Reason recorded on a membership debit.
pub fn membership_reason(coach_id: &str) -> String {
    format!("membership: {coach_id}")
}

/// How an unlock call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockOutcome {
    /// Tokens were debited and an entitlement created.
    Unlocked,
    /// An entitlement already existed; nothing was charged.
    AlreadyOwned,
    /// An interrupted earlier unlock was completed; its debit stands.
    Recovered,
    Free,
    Member,
    PrivilegedBypass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockReceipt {
    pub entitled: bool,
    pub outcome: UnlockOutcome,
    pub new_balance: u64,
    /// The ownership record, when access rests on one.
    pub entitlement: Option<Entitlement>,
    /// Tokens debited by this call or the attempt it completed.
    pub charged: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipReceipt {
    pub membership: Membership,
    pub new_balance: u64,
    pub charged: u64,
}

pub struct PurchaseOrchestrator {
    ledger: Arc<LedgerStore>,
    resolver: EntitlementResolver,
    db: Database,
    locks: KeyedLocks,
}

impl PurchaseOrchestrator {
    pub fn new(ledger: Arc<LedgerStore>) -> Self {
        let db = ledger.database().clone();
        Self {
            resolver: EntitlementResolver::new(db.clone()),
            ledger,
            db,
            locks: KeyedLocks::new(),
        }
    }

    pub fn resolver(&self) -> &EntitlementResolver {
        &self.resolver
    }

    /// Unlock `content` for `identity`, charging its cost at most once.
    pub async fn unlock(
        &self,
        identity: &Identity,
        content: &PremiumContent,
    ) -> Result<UnlockReceipt, PodiumError> {
        let user_id = identity.user_id.as_str();
        let _guard = self.locks.lock(&compound_key(&[user_id, &content.id])).await;

        if let Some(marker) = unlocks::get_marker(&self.db, user_id, &content.id).await? {
            warn!(
                user_id,
                content_id = %content.id,
                debit_transaction_id = %marker.debit_transaction_id,
                "found interrupted unlock, completing grant"
            );
            return self.complete_grant(marker, UnlockOutcome::Recovered).await;
        }

        let outcome = match self.resolver.can_access(identity, content).await? {
            Decision::RequiresUnlock { cost } => {
                return self.charge_and_grant(user_id, content, cost).await;
            }
            Decision::Owned => {
                let entitlement = entitlements::get(&self.db, user_id, &content.id).await?;
                let balance = self.ledger.get_balance(user_id).await?;
                info!(user_id, content_id = %content.id, "unlock skipped, already owned");
                return Ok(UnlockReceipt {
                    entitled: true,
                    outcome: UnlockOutcome::AlreadyOwned,
                    new_balance: balance.balance,
                    entitlement,
                    charged: 0,
                });
            }
            Decision::Free => UnlockOutcome::Free,
            Decision::Member { .. } => UnlockOutcome::Member,
            Decision::PrivilegedBypass => UnlockOutcome::PrivilegedBypass,
        };
        let balance = self.ledger.get_balance(user_id).await?;
        Ok(UnlockReceipt {
            entitled: true,
            outcome,
            new_balance: balance.balance,
            entitlement: None,
            charged: 0,
        })
    }

    async fn charge_and_grant(
        &self,
        user_id: &str,
        content: &PremiumContent,
        cost: u64,
    ) -> Result<UnlockReceipt, PodiumError> {
        let (user, content_id) = (user_id.to_string(), content.id.clone());
        let posting = self
            .ledger
            .debit_with(
                user_id,
                cost,
                TransactionKind::Spent,
                &unlock_reason(&content.id),
                move |tx, debit| {
                    unlocks::insert_marker_in_tx(tx, &user, &content_id, &debit.id, cost).map(Ok)
                },
            )
            .await?;
        self.complete_grant(posting.output, UnlockOutcome::Unlocked).await
    }

    /// Turn a committed debit (identified by its marker) into an entitlement,
    /// or reverse it.
    async fn complete_grant(
        &self,
        marker: PendingUnlock,
        outcome: UnlockOutcome,
    ) -> Result<UnlockReceipt, PodiumError> {
        let granted = entitlements::grant(
            &self.db,
            &marker.user_id,
            &marker.content_id,
            &marker.debit_transaction_id,
        )
        .await;
        match granted {
            Ok(GrantOutcome::Granted(entitlement)) => {
                let balance = self.ledger.get_balance(&marker.user_id).await?;
                info!(
                    user_id = %marker.user_id,
                    content_id = %marker.content_id,
                    transaction_id = %marker.debit_transaction_id,
                    cost = marker.amount,
                    balance = balance.balance,
                    "content unlocked"
                );
                Ok(UnlockReceipt {
                    entitled: true,
                    outcome,
                    new_balance: balance.balance,
                    entitlement: Some(entitlement),
                    charged: marker.amount,
                })
            }
            Ok(GrantOutcome::AlreadyOwned(entitlement)) => {
                // Paid for by another transaction; this debit must not stand.
                self.roll_back(&marker, "content was already owned").await?;
                let balance = self.ledger.get_balance(&marker.user_id).await?;
                Ok(UnlockReceipt {
                    entitled: true,
                    outcome: UnlockOutcome::AlreadyOwned,
                    new_balance: balance.balance,
                    entitlement: Some(entitlement),
                    charged: 0,
                })
            }
            Err(grant_error) => {
                self.roll_back(&marker, &grant_error.to_string()).await?;
                Err(grant_error)
            }
        }
    }

    /// Credit back the marker's debit and clear the marker atomically.
    ///
    /// If that fails too the debit is left with its marker in place and a
    /// [`PodiumError::ConsistencyFault`] is returned.
    async fn roll_back(&self, marker: &PendingUnlock, cause: &str) -> Result<(), PodiumError> {
        let (user, content_id) = (marker.user_id.clone(), marker.content_id.clone());
        let rollback = self
            .ledger
            .credit_with(
                &marker.user_id,
                marker.amount,
                TransactionKind::Earned,
                ROLLBACK_REASON,
                move |tx, _| unlocks::clear_marker_in_tx(tx, &user, &content_id).map(Ok),
            )
            .await;
        match rollback {
            Ok(posting) => {
                warn!(
                    user_id = %marker.user_id,
                    content_id = %marker.content_id,
                    debit_transaction_id = %marker.debit_transaction_id,
                    rollback_transaction_id = %posting.transaction.id,
                    cause,
                    "unlock rolled back"
                );
                Ok(())
            }
            Err(rollback_error) => {
                error!(
                    user_id = %marker.user_id,
                    content_id = %marker.content_id,
                    debit_transaction_id = %marker.debit_transaction_id,
                    amount = marker.amount,
                    cause,
                    error = %rollback_error,
                    "CONSISTENCY FAULT: unlock debit neither granted nor rolled back"
                );
                Err(PodiumError::ConsistencyFault {
                    user_id: marker.user_id.clone(),
                    content_id: marker.content_id.clone(),
                    debit_transaction_id: marker.debit_transaction_id.clone(),
                    detail: format!("grant failed ({cause}); rollback failed ({rollback_error})"),
                })
            }
        }
    }

    /// Buy or renew a coach membership.
    ///
    /// While a membership is active this returns it without charging.
    pub async fn purchase_membership(
        &self,
        identity: &Identity,
        plan: &MembershipPlan,
    ) -> Result<MembershipReceipt, PodiumError> {
        let user_id = identity.user_id.as_str();
        let _guard = self
            .locks
            .lock(&compound_key(&["membership", user_id, &plan.coach_id]))
            .await;

        if let Some(membership) =
            memberships::active(&self.db, user_id, &plan.coach_id, &now_timestamp()).await?
        {
            let balance = self.ledger.get_balance(user_id).await?;
            info!(user_id, coach_id = %plan.coach_id, "membership already active");
            return Ok(MembershipReceipt {
                membership,
                new_balance: balance.balance,
                charged: 0,
            });
        }

        let expires_at = timestamp(Utc::now() + Duration::days(i64::from(plan.duration_days)));
        let (user, coach_id) = (user_id.to_string(), plan.coach_id.clone());
        let posting = self
            .ledger
            .debit_with(
                user_id,
                plan.cost,
                TransactionKind::Spent,
                &membership_reason(&plan.coach_id),
                move |tx, debit| {
                    memberships::upsert_in_tx(tx, &user, &coach_id, &debit.id, &expires_at).map(Ok)
                },
            )
            .await?;
        info!(
            user_id,
            coach_id = %plan.coach_id,
            expires_at = %posting.output.expires_at,
            "membership purchased"
        );
        Ok(MembershipReceipt {
            membership: posting.output,
            new_balance: posting.balance.balance,
            charged: plan.cost,
        })
    }
}
