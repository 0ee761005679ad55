// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-amount credits for engagement events.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use podium_config::model::{LoginWindow, RewardConfig};
use podium_core::types::timestamp;
use podium_core::{PodiumError, RewardEvent, Transaction, TransactionKind};
use podium_storage::Database;
use podium_storage::queries::{rewards, transactions};
use tracing::{debug, info};

use crate::ledger::LedgerStore;
use crate::locks::{KeyedLocks, compound_key};

/// Token amount per event, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardSchedule {
    watch: u64,
    like: u64,
    referral: u64,
    daily_login: u64,
    check_in: u64,
    safety_report: u64,
}

impl RewardSchedule {
    pub fn from_config(config: &RewardConfig) -> Self {
        Self {
            watch: config.watch,
            like: config.like,
            referral: config.referral,
            daily_login: config.daily_login,
            check_in: config.check_in,
            safety_report: config.safety_report,
        }
    }

    pub fn amount(&self, event: RewardEvent) -> u64 {
        match event {
            RewardEvent::Watch => self.watch,
            RewardEvent::Like => self.like,
            RewardEvent::Referral => self.referral,
            RewardEvent::DailyLogin => self.daily_login,
            RewardEvent::CheckIn => self.check_in,
            RewardEvent::SafetyReport => self.safety_report,
        }
    }
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self::from_config(&RewardConfig::default())
    }
}

/// Start of the daily-login window containing `now`.
pub fn window_start(window: LoginWindow, now: DateTime<Utc>) -> DateTime<Utc> {
    match window {
        LoginWindow::Rolling => now - Duration::hours(24),
        LoginWindow::Calendar => now.date_naive().and_time(NaiveTime::MIN).and_utc(),
    }
}

pub struct RewardDispatcher {
    ledger: Arc<LedgerStore>,
    db: Database,
    schedule: RewardSchedule,
    window: LoginWindow,
    dedupe_content: bool,
    locks: KeyedLocks,
}

impl RewardDispatcher {
    pub fn new(ledger: Arc<LedgerStore>, config: &RewardConfig) -> Self {
        Self {
            db: ledger.database().clone(),
            ledger,
            schedule: RewardSchedule::from_config(config),
            window: config.daily_login_window,
            dedupe_content: config.dedupe_content_rewards,
            locks: KeyedLocks::new(),
        }
    }

    pub fn schedule(&self) -> &RewardSchedule {
        &self.schedule
    }

    /// Credit the scheduled amount for `event`.
    ///
    /// Daily login goes through [`claim_daily_login`](Self::claim_daily_login)
    /// and yields `None` when already claimed in the current window; every
    /// other event always credits.
    pub async fn award(
        &self,
        user_id: &str,
        event: RewardEvent,
    ) -> Result<Option<Transaction>, PodiumError> {
        if event == RewardEvent::DailyLogin {
            return self.claim_daily_login_at(user_id, Utc::now()).await;
        }
        let amount = self.schedule.amount(event);
        let transaction = self
            .ledger
            .credit(user_id, amount, TransactionKind::Earned, event.reason())
            .await?;
        info!(user_id, %event, amount, "reward credited");
        Ok(Some(transaction))
    }

    /// Award the daily login reward if not yet claimed in this window.
    pub async fn claim_daily_login(&self, user_id: &str) -> Result<bool, PodiumError> {
        Ok(self.claim_daily_login_at(user_id, Utc::now()).await?.is_some())
    }

    /// [`claim_daily_login`](Self::claim_daily_login) evaluated at `now`.
    ///
    /// The window is checked against the transaction log, never client state.
    pub async fn claim_daily_login_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Transaction>, PodiumError> {
        let _guard = self.locks.lock(&compound_key(&["daily", user_id])).await;
        let reason = RewardEvent::DailyLogin.reason();
        let since = timestamp(window_start(self.window, now));
        if let Some(previous) =
            transactions::latest_with_reason_since(&self.db, user_id, reason, &since).await?
        {
            debug!(user_id, claimed_at = %previous.created_at, "daily login already claimed");
            return Ok(None);
        }
        let amount = self.schedule.amount(RewardEvent::DailyLogin);
        let transaction = self
            .ledger
            .credit(user_id, amount, TransactionKind::Earned, reason)
            .await?;
        info!(user_id, amount, "daily login claimed");
        Ok(Some(transaction))
    }

    /// Reward an event tied to one piece of content.
    ///
    /// With content dedupe enabled the reward is paid once per
    /// (user, content, event); otherwise it credits on every call.
    pub async fn award_for_content(
        &self,
        user_id: &str,
        event: RewardEvent,
        content_id: &str,
    ) -> Result<Option<Transaction>, PodiumError> {
        if event == RewardEvent::DailyLogin {
            return self.claim_daily_login_at(user_id, Utc::now()).await;
        }
        let amount = self.schedule.amount(event);
        let reason = format!("{}: {content_id}", event.reason());
        if !self.dedupe_content {
            return self
                .ledger
                .credit(user_id, amount, TransactionKind::Earned, &reason)
                .await
                .map(Some);
        }

        let event_name = event.to_string();
        let _guard = self
            .locks
            .lock(&compound_key(&[user_id, content_id, &event_name]))
            .await;
        if rewards::has_claim(&self.db, user_id, content_id, &event_name).await? {
            debug!(user_id, content_id, %event, "content reward already claimed");
            return Ok(None);
        }
        let (user, content) = (user_id.to_string(), content_id.to_string());
        let posting = self
            .ledger
            .credit_with(user_id, amount, TransactionKind::Earned, &reason, move |tx, credit| {
                rewards::insert_claim_in_tx(tx, &user, &content, &event_name, &credit.id).map(Ok)
            })
            .await?;
        Ok(Some(posting.transaction))
    }
}
