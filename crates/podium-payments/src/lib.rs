// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP payment processor adapter for the Podium token ledger.
//!
//! Implements [`PaymentProcessor`] against a checkout sessions API:
//! `POST /v1/checkout/sessions` opens a checkout, `GET
//! /v1/checkout/sessions/{id}` reports whether it was paid.

pub mod client;
pub mod types;

use async_trait::async_trait;
use podium_config::model::PaymentConfig;
use podium_core::{
    AdapterType, CheckoutSession, HealthStatus, PaymentProcessor, PluginAdapter, PodiumError,
    ProcessorVerdict, TokenPackage,
};
use secrecy::SecretString;
use tracing::{debug, info};

use crate::client::CheckoutClient;
use crate::types::CreateSessionRequest;

/// Currency sent with every checkout.
pub const CURRENCY: &str = "usd";

pub struct HttpPaymentProcessor {
    client: CheckoutClient,
    success_url: String,
    cancel_url: String,
}

impl HttpPaymentProcessor {
    /// Build a processor from `[payments]`. Requires `api_key`.
    pub fn new(config: &PaymentConfig) -> Result<Self, PodiumError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = CheckoutClient::new(&api_key, &config.base_url, config.max_retries)?;
        info!(base_url = %config.base_url, "payment processor initialized");
        Ok(Self::with_client(client, config))
    }

    /// Build a processor around an existing client (for testing).
    pub fn with_client(client: CheckoutClient, config: &PaymentConfig) -> Self {
        Self {
            client,
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        }
    }
}

fn resolve_api_key(config_key: &Option<String>) -> Result<SecretString, PodiumError> {
    match config_key {
        Some(key) if !key.is_empty() => Ok(SecretString::from(key.clone())),
        _ => Err(PodiumError::Config(
            "payment API key not found. Set payments.api_key in config or PODIUM_PAYMENTS_API_KEY."
                .into(),
        )),
    }
}

#[async_trait]
impl PluginAdapter for HttpPaymentProcessor {
    fn name(&self) -> &str {
        "http-payments"
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
impl PaymentProcessor for HttpPaymentProcessor {
    async fn create_checkout(
        &self,
        package: &TokenPackage,
        user_id: &str,
    ) -> Result<CheckoutSession, PodiumError> {
        let request = CreateSessionRequest {
            client_reference_id: user_id.to_string(),
            package_id: package.id.clone(),
            amount_cents: package.price_cents,
            currency: CURRENCY.to_string(),
            tokens: package.total_tokens(),
            success_url: self.success_url.clone(),
            cancel_url: self.cancel_url.clone(),
        };
        let session = self.client.create_session(&request).await?;
        let redirect_url = session.url.ok_or_else(|| PodiumError::PaymentProcessor {
            message: format!("checkout session {} has no redirect url", session.id),
            source: None,
        })?;
        debug!(session_id = %session.id, package_id = %package.id, "checkout session created");
        Ok(CheckoutSession {
            session_id: session.id,
            redirect_url,
        })
    }

    async fn verify_session(&self, session_id: &str) -> Result<ProcessorVerdict, PodiumError> {
        Ok(match self.client.retrieve_session(session_id).await? {
            Some(session) => session.verdict(),
            None => ProcessorVerdict::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn processor(server: &MockServer) -> HttpPaymentProcessor {
        let config = PaymentConfig {
            base_url: server.uri(),
            api_key: Some("sk_test_123".to_string()),
            ..PaymentConfig::default()
        };
        let client = CheckoutClient::new(
            &SecretString::from("sk_test_123".to_string()),
            &config.base_url,
            config.max_retries,
        )
        .unwrap()
        .with_retry_delay(Duration::from_millis(10));
        HttpPaymentProcessor::with_client(client, &config)
    }

    fn pro() -> TokenPackage {
        TokenPackage {
            id: "pro".to_string(),
            tokens: 500,
            bonus_tokens: 75,
            price_cents: 499,
            label: "Pro".to_string(),
        }
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let err = HttpPaymentProcessor::new(&PaymentConfig::default()).err().unwrap();
        assert!(matches!(err, PodiumError::Config(_)));
    }

    #[tokio::test]
    async fn create_checkout_posts_package() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(body_partial_json(serde_json::json!({
                "client_reference_id": "u1",
                "package_id": "pro",
                "amount_cents": 499,
                "tokens": 575
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_1",
                "url": "https://checkout.example/cs_test_1",
                "status": "open",
                "payment_status": "unpaid"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let checkout = processor(&server).create_checkout(&pro(), "u1").await.unwrap();
        assert_eq!(checkout.session_id, "cs_test_1");
        assert_eq!(checkout.redirect_url, "https://checkout.example/cs_test_1");
    }

    #[tokio::test]
    async fn verify_session_reports_verdicts() {
        let server = MockServer::start().await;
        for (id, status, payment) in [
            ("cs_paid", "complete", "paid"),
            ("cs_open", "open", "unpaid"),
            ("cs_old", "expired", "unpaid"),
        ] {
            Mock::given(method("GET"))
                .and(path(format!("/v1/checkout/sessions/{id}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": id, "status": status, "payment_status": payment
                })))
                .mount(&server)
                .await;
        }
        let processor = processor(&server);
        assert_eq!(processor.verify_session("cs_paid").await.unwrap(), ProcessorVerdict::Paid);
        assert_eq!(processor.verify_session("cs_open").await.unwrap(), ProcessorVerdict::Unpaid);
        assert_eq!(processor.verify_session("cs_old").await.unwrap(), ProcessorVerdict::Expired);
        assert_eq!(
            processor.verify_session("cs_unknown").await.unwrap(),
            ProcessorVerdict::NotFound
        );
    }
}
