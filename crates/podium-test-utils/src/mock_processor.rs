// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock payment processor for deterministic testing.
//!
//! `MockPaymentProcessor` implements `PaymentProcessor` with scripted
//! verdicts, so reconciliation can be tested without a network.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use podium_core::{
    AdapterType, CheckoutSession, HealthStatus, PaymentProcessor, PluginAdapter, PodiumError,
    ProcessorVerdict, TokenPackage,
};

/// A mock processor that answers verifications from a script.
///
/// Scripted answers are popped from a FIFO queue. When the queue is empty
/// the default verdict (initially `Paid`) is returned.
pub struct MockPaymentProcessor {
    script: Arc<Mutex<VecDeque<Result<ProcessorVerdict, String>>>>,
    default_verdict: Mutex<ProcessorVerdict>,
    delay: Mutex<Duration>,
    verify_calls: AtomicUsize,
    checkouts: AtomicUsize,
}

impl MockPaymentProcessor {
    pub fn new() -> Self {
        Self::with_default(ProcessorVerdict::Paid)
    }

    pub fn with_default(verdict: ProcessorVerdict) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            default_verdict: Mutex::new(verdict),
            delay: Mutex::new(Duration::ZERO),
            verify_calls: AtomicUsize::new(0),
            checkouts: AtomicUsize::new(0),
        }
    }

    /// Queue a verdict for the next verification.
    pub async fn push_verdict(&self, verdict: ProcessorVerdict) {
        self.script.lock().await.push_back(Ok(verdict));
    }

    /// Queue a transport failure for the next verification.
    pub async fn push_failure(&self, message: &str) {
        self.script.lock().await.push_back(Err(message.to_string()));
    }

    pub async fn set_default(&self, verdict: ProcessorVerdict) {
        *self.default_verdict.lock().await = verdict;
    }

    /// Make every verification wait this long before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = delay;
    }

    /// Number of `verify_session` calls so far.
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// Number of checkouts created so far.
    pub fn checkouts(&self) -> usize {
        self.checkouts.load(Ordering::SeqCst)
    }
}

impl Default for MockPaymentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockPaymentProcessor {
    fn name(&self) -> &str {
        "mock-payments"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::PaymentProcessor
    }

    async fn health_check(&self) -> Result<HealthStatus, PodiumError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn create_checkout(
        &self,
        package: &TokenPackage,
        _user_id: &str,
    ) -> Result<CheckoutSession, PodiumError> {
        let n = self.checkouts.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("cs_mock_{n}_{}", package.id);
        Ok(CheckoutSession {
            redirect_url: format!("https://checkout.mock/{session_id}"),
            session_id,
        })
    }

    async fn verify_session(&self, _session_id: &str) -> Result<ProcessorVerdict, PodiumError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().await.pop_front();
        match scripted {
            Some(Ok(verdict)) => Ok(verdict),
            Some(Err(message)) => Err(PodiumError::PaymentProcessor {
                message,
                source: None,
            }),
            None => Ok(self.default_verdict.lock().await.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_then_default() {
        let mock = MockPaymentProcessor::with_default(ProcessorVerdict::Unpaid);
        mock.push_verdict(ProcessorVerdict::Paid).await;
        mock.push_failure("connection reset").await;

        assert_eq!(mock.verify_session("cs").await.unwrap(), ProcessorVerdict::Paid);
        assert!(mock.verify_session("cs").await.is_err());
        assert_eq!(mock.verify_session("cs").await.unwrap(), ProcessorVerdict::Unpaid);
        assert_eq!(mock.verify_calls(), 3);
    }

    #[tokio::test]
    async fn checkout_ids_are_unique() {
        let mock = MockPaymentProcessor::new();
        let package = TokenPackage {
            id: "pro".into(),
            tokens: 500,
            bonus_tokens: 75,
            price_cents: 499,
            label: "Pro".into(),
        };
        let a = mock.create_checkout(&package, "u1").await.unwrap();
        let b = mock.create_checkout(&package, "u1").await.unwrap();
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(mock.checkouts(), 2);
    }
}
