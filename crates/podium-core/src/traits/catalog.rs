// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only catalog of token packages, content prices, and membership plans.

use async_trait::async_trait;

use crate::error::PodiumError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{MembershipPlan, PremiumContent, TokenPackage};

/// Static reference data the ledger prices against.
#[async_trait]
pub trait Catalog: PluginAdapter {
    /// All purchasable token packages.
    async fn packages(&self) -> Result<Vec<TokenPackage>, PodiumError>;

    async fn package(&self, id: &str) -> Result<Option<TokenPackage>, PodiumError>;

    async fn content(&self, id: &str) -> Result<Option<PremiumContent>, PodiumError>;

    async fn membership_plan(&self, coach_id: &str)
    -> Result<Option<MembershipPlan>, PodiumError>;
}
