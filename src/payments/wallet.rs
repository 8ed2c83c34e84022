//! Wallet processor adapter.
//!
//! The stored payment reference is an order-capture identifier on the
//! wallet side, and the refundable capture is nested inside that order
//! resource rather than directly addressable. A refund is therefore
//! three calls: exchange client credentials for a short-lived access
//! token, read the order to resolve the capture id, then refund the
//! capture. Token caching is deliberately absent; one token per refund
//! keeps the adapter stateless.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::WalletConfig;
use crate::OrderError;

use super::{RefundOutcome, RefundProvider, PROVIDER_TIMEOUT};

pub struct WalletAdapter {
    client: Client,
    api_base: String,
    client_id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct WalletOrder {
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Deserialize)]
struct PurchaseUnit {
    payments: Option<UnitPayments>,
}

#[derive(Deserialize)]
struct UnitPayments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Deserialize)]
struct Capture {
    id: String,
}

#[derive(Deserialize)]
struct RefundResponse {
    id: String,
}

impl WalletAdapter {
    pub fn new(config: WalletConfig) -> Result<Self, OrderError> {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| OrderError::Config(format!("wallet http client: {e}")))?;
        Ok(Self {
            client,
            api_base: config.api_base,
            client_id: config.client_id,
            client_secret: config.client_secret,
        })
    }

    async fn access_token(&self) -> Result<String, String> {
        let response = self
            .client
            .post(format!("{}/oauth2/token", self.api_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| format!("wallet token request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("wallet token endpoint returned HTTP {status}"));
        }

        response
            .json::<TokenResponse>()
            .await
            .map(|body| body.access_token)
            .map_err(|e| format!("wallet token response malformed: {e}"))
    }

    /// The capture lives at `purchase_units[0].payments.captures[0]`.
    async fn capture_id(&self, token: &str, order_ref: &str) -> Result<String, String> {
        let response = self
            .client
            .get(format!("{}/orders/{order_ref}", self.api_base))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| format!("wallet order lookup failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("wallet order lookup returned HTTP {status}"));
        }

        let order = response
            .json::<WalletOrder>()
            .await
            .map_err(|e| format!("wallet order response malformed: {e}"))?;

        order
            .purchase_units
            .first()
            .and_then(|unit| unit.payments.as_ref())
            .and_then(|payments| payments.captures.first())
            .map(|capture| capture.id.clone())
            .ok_or_else(|| "no capture found for order".to_string())
    }
}

#[async_trait]
impl RefundProvider for WalletAdapter {
    async fn refund(&self, payment_reference: &str) -> RefundOutcome {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(message) => return RefundOutcome::failure(message),
        };

        let capture_id = match self.capture_id(&token, payment_reference).await {
            Ok(id) => id,
            Err(message) => return RefundOutcome::failure(message),
        };

        let response = self
            .client
            .post(format!("{}/payments/captures/{capture_id}/refund", self.api_base))
            .bearer_auth(&token)
            .json(&serde_json::json!({}))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return RefundOutcome::failure(format!("wallet refund request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return RefundOutcome::failure(format!("wallet refund returned HTTP {status}"));
        }

        match response.json::<RefundResponse>().await {
            Ok(body) => RefundOutcome::success(body.id),
            Err(e) => RefundOutcome::failure(format!("wallet refund response malformed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn adapter(base_url: String) -> WalletAdapter {
        WalletAdapter::new(WalletConfig {
            api_base: base_url,
            client_id: "client-1".to_string(),
            client_secret: "secret-1".to_string(),
        })
        .unwrap()
    }

    fn mock_token(server: &MockServer) {
        server.mock(|when, then| {
            when.method(POST).path("/oauth2/token");
            then.status(200)
                .json_body(serde_json::json!({"access_token": "tok_1", "token_type": "Bearer"}));
        });
    }

    #[tokio::test]
    async fn full_refund_flow_resolves_nested_capture() {
        let server = MockServer::start();
        mock_token(&server);
        server.mock(|when, then| {
            when.method(GET)
                .path("/orders/ord_9")
                .header("authorization", "Bearer tok_1");
            then.status(200).json_body(serde_json::json!({
                "id": "ord_9",
                "purchase_units": [
                    {"payments": {"captures": [{"id": "cap_5", "status": "COMPLETED"}]}}
                ]
            }));
        });
        let refund = server.mock(|when, then| {
            when.method(POST)
                .path("/payments/captures/cap_5/refund")
                .header("authorization", "Bearer tok_1");
            then.status(201)
                .json_body(serde_json::json!({"id": "wref_7", "status": "COMPLETED"}));
        });

        let outcome = adapter(server.base_url()).refund("ord_9").await;

        refund.assert();
        assert!(outcome.success);
        assert_eq!(outcome.refund_id.as_deref(), Some("wref_7"));
    }

    #[tokio::test]
    async fn missing_capture_fails_before_the_refund_endpoint() {
        let server = MockServer::start();
        mock_token(&server);
        server.mock(|when, then| {
            when.method(GET).path("/orders/ord_9");
            then.status(200)
                .json_body(serde_json::json!({"id": "ord_9", "purchase_units": [{}]}));
        });
        let refund = server.mock(|when, then| {
            when.method(POST).path_contains("/refund");
            then.status(201).json_body(serde_json::json!({"id": "never"}));
        });

        let outcome = adapter(server.base_url()).refund("ord_9").await;

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("no capture found for order"));
        refund.assert_hits(0);
    }

    #[tokio::test]
    async fn token_failure_propagates_as_failure_outcome() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth2/token");
            then.status(401)
                .json_body(serde_json::json!({"error": "invalid_client"}));
        });

        let outcome = adapter(server.base_url()).refund("ord_9").await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("401"));
    }

    #[tokio::test]
    async fn order_lookup_error_is_captured() {
        let server = MockServer::start();
        mock_token(&server);
        server.mock(|when, then| {
            when.method(GET).path("/orders/ord_9");
            then.status(404).body("not found");
        });

        let outcome = adapter(server.base_url()).refund("ord_9").await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("order lookup"));
    }
}
