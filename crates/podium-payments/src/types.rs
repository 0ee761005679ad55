// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the checkout sessions API.

use podium_core::ProcessorVerdict;
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/checkout/sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    /// Our user id, echoed back by the processor.
    pub client_reference_id: String,
    pub package_id: String,
    pub amount_cents: u64,
    pub currency: String,
    pub tokens: u64,
    pub success_url: String,
    pub cancel_url: String,
}

/// A checkout session as returned by create and retrieve.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    /// `open`, `complete` or `expired`.
    #[serde(default)]
    pub status: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    #[serde(default)]
    pub payment_status: Option<String>,
}

impl SessionResponse {
    pub fn verdict(&self) -> ProcessorVerdict {
        match (self.payment_status.as_deref(), self.status.as_deref()) {
            (Some("paid" | "no_payment_required"), _) => ProcessorVerdict::Paid,
            (_, Some("expired")) => ProcessorVerdict::Expired,
            _ => ProcessorVerdict::Unpaid,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(status: &str, payment_status: &str) -> SessionResponse {
        serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "status": status,
            "payment_status": payment_status,
        }))
        .unwrap()
    }

    #[test]
    fn verdict_mapping() {
        assert_eq!(session("complete", "paid").verdict(), ProcessorVerdict::Paid);
        assert_eq!(session("open", "unpaid").verdict(), ProcessorVerdict::Unpaid);
        assert_eq!(session("expired", "unpaid").verdict(), ProcessorVerdict::Expired);
        assert_eq!(
            session("complete", "no_payment_required").verdict(),
            ProcessorVerdict::Paid
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let parsed: SessionResponse = serde_json::from_value(serde_json::json!({
            "id": "cs_2",
            "object": "checkout.session",
            "livemode": false
        }))
        .unwrap();
        assert_eq!(parsed.verdict(), ProcessorVerdict::Unpaid);
        assert!(parsed.url.is_none());
    }
}
