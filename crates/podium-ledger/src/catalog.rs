// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog backed by the `[[packages]]`, `[[content]]` and `[[memberships]]`
//! configuration sections.

use std::collections::HashMap;

use async_trait::async_trait;
use podium_config::PodiumConfig;
use podium_core::{
    AdapterType, Catalog, HealthStatus, MembershipPlan, PluginAdapter, PodiumError,
    PremiumContent, TokenPackage,
};

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    packages: Vec<TokenPackage>,
    content: HashMap<String, PremiumContent>,
    plans: HashMap<String, MembershipPlan>,
}

impl StaticCatalog {
    pub fn from_config(config: &PodiumConfig) -> Self {
        let packages = config
            .packages
            .iter()
            .map(|p| TokenPackage {
                id: p.id.clone(),
                tokens: p.tokens,
                bonus_tokens: p.bonus_tokens,
                price_cents: p.price_cents,
                label: p.label.clone(),
            })
            .collect();
        let content = config
            .content
            .iter()
            .map(|c| {
                let item = PremiumContent {
                    id: c.id.clone(),
                    kind: c.kind,
                    cost: c.cost,
                    coach_id: c.coach_id.clone(),
                };
                (c.id.clone(), item)
            })
            .collect();
        let plans = config
            .memberships
            .iter()
            .map(|m| {
                let plan = MembershipPlan {
                    coach_id: m.coach_id.clone(),
                    cost: m.cost,
                    duration_days: m.duration_days,
                };
                (m.coach_id.clone(), plan)
            })
            .collect();
        Self {
            packages,
            content,
            plans,
        }
    }

    /// Add or replace a content item.
    pub fn with_content(mut self, item: PremiumContent) -> Self {
        self.content.insert(item.id.clone(), item);
        self
    }
}

#[async_trait]
impl PluginAdapter for StaticCatalog {
    fn name(&self) -> &str {
        "static-catalog"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Catalog
    }

    async fn health_check(&self) -> Result<HealthStatus, PodiumError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn packages(&self) -> Result<Vec<TokenPackage>, PodiumError> {
        Ok(self.packages.clone())
    }

    async fn package(&self, id: &str) -> Result<Option<TokenPackage>, PodiumError> {
        Ok(self.packages.iter().find(|p| p.id == id).cloned())
    }

    async fn content(&self, id: &str) -> Result<Option<PremiumContent>, PodiumError> {
        Ok(self.content.get(id).cloned())
    }

    async fn membership_plan(
        &self,
        coach_id: &str,
    ) -> Result<Option<MembershipPlan>, PodiumError> {
        Ok(self.plans.get(coach_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_config::model::{ContentConfig, MembershipPlanConfig};
    use podium_core::ContentKind;

    #[tokio::test]
    async fn default_packages_are_listed_in_order() {
        let catalog = StaticCatalog::from_config(&PodiumConfig::default());
        let ids: Vec<_> = catalog
            .packages()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, ["starter", "pro", "elite", "champion"]);
        let pro = catalog.package("pro").await.unwrap().unwrap();
        assert_eq!(pro.total_tokens(), 575);
    }

    #[tokio::test]
    async fn content_and_plans_come_from_config() {
        let mut config = PodiumConfig::default();
        config.content.push(ContentConfig {
            id: "live-1".to_string(),
            kind: ContentKind::Livestream,
            cost: 30,
            coach_id: Some("coach-1".to_string()),
        });
        config.memberships.push(MembershipPlanConfig {
            coach_id: "coach-1".to_string(),
            cost: 150,
            duration_days: 30,
        });
        let catalog = StaticCatalog::from_config(&config);
        assert_eq!(catalog.content("live-1").await.unwrap().unwrap().cost, 30);
        assert!(catalog.content("nope").await.unwrap().is_none());
        assert_eq!(catalog.membership_plan("coach-1").await.unwrap().unwrap().cost, 150);
    }
}
