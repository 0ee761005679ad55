// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end ledger tests.
//!
//! `TestHarness` assembles a full `TokenEngine` on a temp SQLite database
//! with a `MockPaymentProcessor` and a catalog built from the builder's
//! options.

use std::sync::Arc;

use podium_config::PodiumConfig;
use podium_config::model::{ContentConfig, MembershipPlanConfig};
use podium_core::{ContentKind, Identity, PaymentProcessor, PodiumError};
use podium_ledger::{StaticCatalog, TokenEngine};
use podium_storage::{Database, map_tr_err};

use crate::mock_processor::MockPaymentProcessor;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: PodiumConfig,
    processor: Option<Arc<MockPaymentProcessor>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = PodiumConfig::default();
        config.payments.verify_timeout_secs = 1;
        Self {
            config,
            processor: Some(Arc::new(MockPaymentProcessor::new())),
        }
    }

    /// Tokens credited to each new account.
    pub fn with_welcome_bonus(mut self, tokens: u64) -> Self {
        self.config.ledger.welcome_bonus = tokens;
        self
    }

    /// Add a video to the catalog.
    pub fn with_content(self, id: &str, cost: u64) -> Self {
        self.with_content_item(id, ContentKind::Video, cost, None)
    }

    /// Add a video owned by `coach_id` to the catalog.
    pub fn with_coach_content(self, id: &str, cost: u64, coach_id: &str) -> Self {
        self.with_content_item(id, ContentKind::Video, cost, Some(coach_id))
    }

    pub fn with_content_item(
        mut self,
        id: &str,
        kind: ContentKind,
        cost: u64,
        coach_id: Option<&str>,
    ) -> Self {
        self.config.content.push(ContentConfig {
            id: id.to_string(),
            kind,
            cost,
            coach_id: coach_id.map(str::to_string),
        });
        self
    }

    pub fn with_membership_plan(mut self, coach_id: &str, cost: u64, duration_days: u32) -> Self {
        self.config.memberships.push(MembershipPlanConfig {
            coach_id: coach_id.to_string(),
            cost,
            duration_days,
        });
        self
    }

    pub fn with_content_reward_dedupe(mut self) -> Self {
        self.config.rewards.dedupe_content_rewards = true;
        self
    }

    pub fn with_verify_timeout_secs(mut self, secs: u64) -> Self {
        self.config.payments.verify_timeout_secs = secs;
        self
    }

    pub fn with_processor(mut self, processor: MockPaymentProcessor) -> Self {
        self.processor = Some(Arc::new(processor));
        self
    }

    /// Build without any payment processor configured.
    pub fn without_processor(mut self) -> Self {
        self.processor = None;
        self
    }

    /// Build the harness on a fresh temp database.
    pub async fn build(mut self) -> Result<TestHarness, PodiumError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| PodiumError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("podium-test.db");
        self.config.storage.database_path = db_path.to_string_lossy().to_string();

        let db = Database::open_with(&self.config.storage).await?;
        let catalog = Arc::new(StaticCatalog::from_config(&self.config));
        let processor = self
            .processor
            .clone()
            .map(|p| p as Arc<dyn PaymentProcessor>);
        let engine = TokenEngine::new(db.clone(), &self.config, catalog, processor);

        Ok(TestHarness {
            engine,
            db,
            processor: self.processor,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A fully assembled engine on a temp database.
pub struct TestHarness {
    engine: TokenEngine,
    db: Database,
    processor: Option<Arc<MockPaymentProcessor>>,
    config: PodiumConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn engine(&self) -> &TokenEngine {
        &self.engine
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &PodiumConfig {
        &self.config
    }

    /// The mock processor. Panics if built `without_processor`.
    pub fn processor(&self) -> &MockPaymentProcessor {
        match &self.processor {
            Some(processor) => processor,
            None => panic!("harness was built without a payment processor"),
        }
    }

    /// A plain user identity.
    pub fn user(&self, user_id: &str) -> Identity {
        Identity::user(user_id)
    }

    /// Run raw SQL against the ledger database (fault injection).
    pub async fn execute_sql(&self, sql: &str) -> Result<(), PodiumError> {
        let sql = sql.to_string();
        self.db
            .connection()
            .call(move |conn| conn.execute_batch(&sql))
            .await
            .map_err(map_tr_err)
    }

    /// Count rows matching a query that returns one integer.
    pub async fn count(&self, sql: &str) -> Result<i64, PodiumError> {
        let sql = sql.to_string();
        self.db
            .connection()
            .call(move |conn| conn.query_row(&sql, [], |row| row.get(0)))
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_builds_working_engine() {
        let harness = TestHarness::builder()
            .with_welcome_bonus(40)
            .with_content("vid-1", 20)
            .build()
            .await
            .unwrap();
        let receipt = harness
            .engine()
            .unlock(&harness.user("u1"), "vid-1")
            .await
            .unwrap();
        assert_eq!(receipt.new_balance, 20);
        assert_eq!(
            harness.count("SELECT COUNT(*) FROM entitlements").await.unwrap(),
            1
        );
    }
}
