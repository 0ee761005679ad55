// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment processor adapter trait.

use async_trait::async_trait;

use crate::error::PodiumError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CheckoutSession, ProcessorVerdict, TokenPackage};

/// An external payment processor reached through checkout sessions.
///
/// The processor is a black box: it opens a checkout for a package and,
/// later, answers whether a given session has been paid.
#[async_trait]
pub trait PaymentProcessor: PluginAdapter {
    /// Opens a checkout session for `package` on behalf of `user_id`.
    async fn create_checkout(
        &self,
        package: &TokenPackage,
        user_id: &str,
    ) -> Result<CheckoutSession, PodiumError>;

    /// Asks the processor whether `session_id` has been paid.
    ///
    /// Transport failures are errors; an unknown session is
    /// [`ProcessorVerdict::NotFound`].
    async fn verify_session(&self, session_id: &str) -> Result<ProcessorVerdict, PodiumError>;
}
