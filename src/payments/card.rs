//! Card processor adapter.
//!
//! The stored payment reference is a payment-intent identifier; a single
//! `POST /refunds` against it returns the refund id. The processor
//! refunds the full captured amount when none is given.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::CardConfig;
use crate::OrderError;

use super::{RefundOutcome, RefundProvider, PROVIDER_TIMEOUT};

pub struct CardAdapter {
    client: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Serialize)]
struct RefundRequest<'a> {
    payment_intent: &'a str,
}

#[derive(Deserialize)]
struct RefundResponse {
    id: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CardAdapter {
    pub fn new(config: CardConfig) -> Result<Self, OrderError> {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| OrderError::Config(format!("card http client: {e}")))?;
        Ok(Self {
            client,
            api_base: config.api_base,
            secret_key: config.secret_key,
        })
    }
}

#[async_trait]
impl RefundProvider for CardAdapter {
    async fn refund(&self, payment_reference: &str) -> RefundOutcome {
        let response = self
            .client
            .post(format!("{}/refunds", self.api_base))
            .bearer_auth(&self.secret_key)
            .json(&RefundRequest {
                payment_intent: payment_reference,
            })
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return RefundOutcome::failure(format!("card refund request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            // The processor reports declines as a structured error body.
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error.message,
                Err(_) => format!("card refund failed with HTTP {status}"),
            };
            return RefundOutcome::failure(message);
        }

        match response.json::<RefundResponse>().await {
            Ok(body) => RefundOutcome::success(body.id),
            Err(e) => RefundOutcome::failure(format!("card refund response malformed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn adapter(base_url: String) -> CardAdapter {
        CardAdapter::new(CardConfig {
            api_base: base_url,
            secret_key: "sk_test_1".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn successful_refund_returns_provider_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/refunds")
                .header("authorization", "Bearer sk_test_1")
                .json_body(serde_json::json!({"payment_intent": "pi_123"}));
            then.status(200)
                .json_body(serde_json::json!({"id": "re_1", "status": "succeeded"}));
        });

        let outcome = adapter(server.base_url()).refund("pi_123").await;

        mock.assert();
        assert!(outcome.success);
        assert_eq!(outcome.refund_id.as_deref(), Some("re_1"));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn decline_surfaces_the_processor_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/refunds");
            then.status(402)
                .json_body(serde_json::json!({"error": {"message": "card declined"}}));
        });

        let outcome = adapter(server.base_url()).refund("pi_123").await;

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("card declined"));
    }

    #[tokio::test]
    async fn opaque_server_error_reports_http_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/refunds");
            then.status(500).body("upstream exploded");
        });

        let outcome = adapter(server.base_url()).refund("pi_123").await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn network_error_becomes_failure_outcome() {
        // Port with nothing listening.
        let outcome = adapter("http://127.0.0.1:1".to_string()).refund("pi_123").await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("card refund request failed"));
    }
}
