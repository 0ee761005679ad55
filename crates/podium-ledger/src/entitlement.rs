// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access decisions. Reads only; safe to call speculatively.

use podium_core::types::now_timestamp;
use podium_core::{Decision, Identity, PodiumError, PremiumContent};
use podium_storage::Database;
use podium_storage::queries::{entitlements, memberships};
use tracing::debug;

#[derive(Clone)]
pub struct EntitlementResolver {
    db: Database,
}

impl EntitlementResolver {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Decide whether `identity` may open `content`.
    ///
    /// Checked in order: free content, an owned entitlement, an active
    /// membership of the content's coach, a reviewer capability. Anything
    /// else requires an unlock at the content's cost.
    pub async fn can_access(
        &self,
        identity: &Identity,
        content: &PremiumContent,
    ) -> Result<Decision, PodiumError> {
        let decision = self.decide(identity, content).await?;
        debug!(user_id = %identity.user_id, content_id = %content.id, ?decision, "access decision");
        Ok(decision)
    }

    async fn decide(
        &self,
        identity: &Identity,
        content: &PremiumContent,
    ) -> Result<Decision, PodiumError> {
        if content.is_free() {
            return Ok(Decision::Free);
        }
        if entitlements::get(&self.db, &identity.user_id, &content.id)
            .await?
            .is_some()
        {
            return Ok(Decision::Owned);
        }
        if let Some(coach_id) = &content.coach_id {
            let now = now_timestamp();
            if let Some(membership) =
                memberships::active(&self.db, &identity.user_id, coach_id, &now).await?
            {
                return Ok(Decision::Member {
                    coach_id: membership.coach_id,
                    expires_at: membership.expires_at,
                });
            }
        }
        if identity.has_premium_bypass() {
            return Ok(Decision::PrivilegedBypass);
        }
        Ok(Decision::RequiresUnlock { cost: content.cost })
    }
}
