// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the processor's checkout sessions API.
//!
//! Handles bearer authentication, JSON bodies, and one retry (by default)
//! on transient statuses (429, 500, 502, 503).

use std::time::Duration;

use podium_core::PodiumError;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, CreateSessionRequest, SessionResponse};

const SESSIONS_PATH: &str = "/v1/checkout/sessions";

#[derive(Debug, Clone)]
pub struct CheckoutClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl CheckoutClient {
    pub fn new(api_key: &SecretString, base_url: &str, max_retries: u32) -> Result<Self, PodiumError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|e| PodiumError::Config(format!("invalid payment API key: {e}")))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PodiumError::PaymentProcessor {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Shorten the pause between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// `POST /v1/checkout/sessions`.
    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionResponse, PodiumError> {
        let url = format!("{}{SESSIONS_PATH}", self.base_url);
        let response = self.send(|client| client.post(&url).json(request)).await?;
        let status = response.status();
        if status.is_success() {
            return parse_body(response).await;
        }
        Err(api_error(status, response).await)
    }

    /// `GET /v1/checkout/sessions/{id}`; `None` on 404.
    pub async fn retrieve_session(&self, id: &str) -> Result<Option<SessionResponse>, PodiumError> {
        let url = self.session_url(id)?;
        let response = self.send(|client| client.get(url.clone())).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(session_id = id, "processor does not know session");
            return Ok(None);
        }
        if status.is_success() {
            return parse_body(response).await.map(Some);
        }
        Err(api_error(status, response).await)
    }

    /// Session resource URL with `id` percent-encoded as a single path segment.
    fn session_url(&self, id: &str) -> Result<reqwest::Url, PodiumError> {
        let mut url = reqwest::Url::parse(&format!("{}{SESSIONS_PATH}", self.base_url))
            .map_err(|e| PodiumError::Config(format!("invalid payments base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| PodiumError::Config(format!("payments base URL cannot hold a path: {}", self.base_url)))?
            .push(id);
        Ok(url)
    }

    /// Send a request, retrying transient statuses. Returns the last response.
    async fn send<F>(&self, build: F) -> Result<reqwest::Response, PodiumError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                warn!(attempt, "retrying payment processor request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }
            let response = build(&self.client)
                .send()
                .await
                .map_err(|e| PodiumError::PaymentProcessor {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;
            let status = response.status();
            debug!(status = %status, attempt, "payment processor response");
            if is_transient_error(status) && attempt < self.max_retries {
                attempt += 1;
                continue;
            }
            return Ok(response);
        }
    }
}

async fn parse_body(response: reqwest::Response) -> Result<SessionResponse, PodiumError> {
    let body = response.text().await.map_err(|e| PodiumError::PaymentProcessor {
        message: format!("failed to read response body: {e}"),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&body).map_err(|e| PodiumError::PaymentProcessor {
        message: format!("failed to parse processor response: {e}"),
        source: Some(Box::new(e)),
    })
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> PodiumError {
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_err) => format!(
            "processor error ({}): {}",
            api_err.error.type_, api_err.error.message
        ),
        Err(_) => format!("processor returned {status}: {body}"),
    };
    PodiumError::PaymentProcessor {
        message,
        source: None,
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CheckoutClient {
        CheckoutClient::new(&SecretString::from("sk_test_123".to_string()), &server.uri(), 1)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn retrieve_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_1"))
            .and(header("authorization", "Bearer sk_test_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_1", "status": "complete", "payment_status": "paid"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server).retrieve_session("cs_1").await.unwrap().unwrap();
        assert_eq!(session.id, "cs_1");
    }

    #[tokio::test]
    async fn retrieve_maps_404_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        assert!(client(&server).retrieve_session("cs_gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_id_is_encoded_as_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs%201%2F..%3Fx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs 1/..?x", "status": "open", "payment_status": "unpaid"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server).retrieve_session("cs 1/..?x").await.unwrap().unwrap();
        assert_eq!(session.id, "cs 1/..?x");
    }

    #[test]
    fn session_url_keeps_the_collection_prefix() {
        let c = CheckoutClient::new(&SecretString::from("sk".to_string()), "https://pay.example/", 0).unwrap();
        assert_eq!(
            c.session_url("a/b").unwrap().as_str(),
            "https://pay.example/v1/checkout/sessions/a%2Fb"
        );
    }

    #[tokio::test]
    async fn retries_once_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_1", "status": "open", "payment_status": "unpaid"
            })))
            .mount(&server)
            .await;
        let session = client(&server).retrieve_session("cs_1").await.unwrap().unwrap();
        assert_eq!(session.payment_status.as_deref(), Some("unpaid"));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": {"type": "api_error", "message": "boom"}
            })))
            .expect(2)
            .mount(&server)
            .await;
        let request = CreateSessionRequest {
            client_reference_id: "u1".into(),
            package_id: "pro".into(),
            amount_cents: 499,
            currency: "usd".into(),
            tokens: 575,
            success_url: "https://app/ok".into(),
            cancel_url: "https://app/cancel".into(),
        };
        let err = client(&server).create_session(&request).await.unwrap_err();
        assert!(err.to_string().contains("api_error"), "got: {err}");
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        assert!(client(&server).retrieve_session("cs_1").await.is_err());
    }
}
