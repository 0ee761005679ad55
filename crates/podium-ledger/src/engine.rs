// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `TokenEngine`: the surface the rest of the platform calls.
//!
//! Wires the ledger, resolver, orchestrator, reconciler and reward
//! dispatcher to one database, resolves catalog ids, and keeps the
//! displayed-balance layer reconciled with every authoritative result.

use std::sync::Arc;

use podium_config::PodiumConfig;
use podium_core::{
    AccountBalance, Catalog, CheckoutSession, Decision, Entitlement, HealthStatus, Identity,
    PaymentProcessor, PaymentSession, PodiumError, PremiumContent, RewardEvent, TokenPackage,
    Transaction,
};
use podium_storage::queries::{entitlements, payments, unlocks};
use podium_storage::{Database, PendingUnlock};
use tracing::info;

use crate::catalog::StaticCatalog;
use crate::display::DisplayedBalances;
use crate::ledger::{AuditReport, LedgerStore};
use crate::purchase::{MembershipReceipt, PurchaseOrchestrator, UnlockReceipt};
use crate::reconciler::{PaymentCredit, PaymentReconciler};
use crate::rewards::RewardDispatcher;

pub struct TokenEngine {
    ledger: Arc<LedgerStore>,
    orchestrator: PurchaseOrchestrator,
    reconciler: PaymentReconciler,
    rewards: RewardDispatcher,
    catalog: Arc<dyn Catalog>,
    display: DisplayedBalances,
}

impl TokenEngine {
    pub fn new(
        db: Database,
        config: &PodiumConfig,
        catalog: Arc<dyn Catalog>,
        processor: Option<Arc<dyn PaymentProcessor>>,
    ) -> Self {
        let ledger = Arc::new(LedgerStore::from_config(db, &config.ledger));
        Self {
            orchestrator: PurchaseOrchestrator::new(ledger.clone()),
            reconciler: PaymentReconciler::from_config(
                ledger.clone(),
                catalog.clone(),
                processor,
                &config.payments,
            ),
            rewards: RewardDispatcher::new(ledger.clone(), &config.rewards),
            ledger,
            catalog,
            display: DisplayedBalances::new(),
        }
    }

    /// Open the configured database and serve the configured catalog.
    pub async fn open(
        config: &PodiumConfig,
        processor: Option<Arc<dyn PaymentProcessor>>,
    ) -> Result<Self, PodiumError> {
        let db = Database::open_with(&config.storage).await?;
        let catalog = Arc::new(StaticCatalog::from_config(config));
        info!(database = %config.storage.database_path, "token engine ready");
        Ok(Self::new(db, config, catalog, processor))
    }

    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }

    pub fn database(&self) -> &Database {
        self.ledger.database()
    }

    /// Optimistic client-side balance layer.
    pub fn display(&self) -> &DisplayedBalances {
        &self.display
    }

    pub fn displayed_balance(&self, user_id: &str) -> Option<u64> {
        self.display.shown(user_id)
    }

    pub async fn get_balance(&self, user_id: &str) -> Result<AccountBalance, PodiumError> {
        let balance = self.ledger.get_balance(user_id).await?;
        self.display.reconcile(&balance);
        Ok(balance)
    }

    pub async fn can_access(
        &self,
        identity: &Identity,
        content_id: &str,
    ) -> Result<Decision, PodiumError> {
        let content = self.content(content_id).await?;
        self.orchestrator.resolver().can_access(identity, &content).await
    }

    pub async fn unlock(
        &self,
        identity: &Identity,
        content_id: &str,
    ) -> Result<UnlockReceipt, PodiumError> {
        let content = self.content(content_id).await?;
        let receipt = self.orchestrator.unlock(identity, &content).await?;
        self.get_balance(&identity.user_id).await?;
        Ok(receipt)
    }

    pub async fn purchase_membership(
        &self,
        identity: &Identity,
        coach_id: &str,
    ) -> Result<MembershipReceipt, PodiumError> {
        let plan = self
            .catalog
            .membership_plan(coach_id)
            .await?
            .ok_or_else(|| PodiumError::NotFound {
                kind: "membership plan",
                id: coach_id.to_string(),
            })?;
        let receipt = self.orchestrator.purchase_membership(identity, &plan).await?;
        self.get_balance(&identity.user_id).await?;
        Ok(receipt)
    }

    pub async fn packages(&self) -> Result<Vec<TokenPackage>, PodiumError> {
        self.catalog.packages().await
    }

    pub async fn begin_checkout(
        &self,
        user_id: &str,
        package_id: &str,
    ) -> Result<CheckoutSession, PodiumError> {
        self.reconciler.begin_checkout(user_id, package_id).await
    }

    pub async fn verify_payment(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<PaymentCredit, PodiumError> {
        let credit = self.reconciler.verify_and_credit(session_id, user_id).await?;
        self.get_balance(user_id).await?;
        Ok(credit)
    }

    /// Credit an engagement reward. `None` means a daily login already
    /// claimed in the current window.
    pub async fn award_event(
        &self,
        user_id: &str,
        event: RewardEvent,
    ) -> Result<Option<Transaction>, PodiumError> {
        let awarded = self.rewards.award(user_id, event).await?;
        self.get_balance(user_id).await?;
        Ok(awarded)
    }

    pub async fn award_for_content(
        &self,
        user_id: &str,
        event: RewardEvent,
        content_id: &str,
    ) -> Result<Option<Transaction>, PodiumError> {
        let awarded = self
            .rewards
            .award_for_content(user_id, event, content_id)
            .await?;
        self.get_balance(user_id).await?;
        Ok(awarded)
    }

    pub async fn claim_daily_login(&self, user_id: &str) -> Result<bool, PodiumError> {
        let claimed = self.rewards.claim_daily_login(user_id).await?;
        self.get_balance(user_id).await?;
        Ok(claimed)
    }

    pub async fn history(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, PodiumError> {
        self.ledger.history(user_id, limit).await
    }

    pub async fn history_before(
        &self,
        user_id: &str,
        before_seq: i64,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, PodiumError> {
        self.ledger.history_before(user_id, before_seq, limit).await
    }

    pub async fn audit(&self, user_id: &str) -> Result<AuditReport, PodiumError> {
        self.ledger.audit(user_id).await
    }

    /// Unlock debits across all users that were neither granted nor refunded.
    pub async fn stranded_unlocks(&self) -> Result<Vec<PendingUnlock>, PodiumError> {
        unlocks::list_all(self.database()).await
    }

    /// Content the user owns outright, oldest first.
    pub async fn entitlements(&self, user_id: &str) -> Result<Vec<Entitlement>, PodiumError> {
        entitlements::list_for_user(self.database(), user_id).await
    }

    /// The user's checkout sessions, newest first.
    pub async fn payment_sessions(&self, user_id: &str) -> Result<Vec<PaymentSession>, PodiumError> {
        payments::list_for_user(self.database(), user_id).await
    }

    pub async fn health_check(&self) -> Result<HealthStatus, PodiumError> {
        self.database().health_check().await
    }

    async fn content(&self, content_id: &str) -> Result<PremiumContent, PodiumError> {
        self.catalog
            .content(content_id)
            .await?
            .ok_or_else(|| PodiumError::NotFound {
                kind: "content",
                id: content_id.to_string(),
            })
    }
}
