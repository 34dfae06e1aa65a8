//! # Stripe Payment Intents
//!
//! Implementation of the Stripe PaymentIntents API.
//! The browser confirms the intent with the returned client secret.

use crate::config::StripeConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shop_core::{Currency, PaymentGateway, PaymentIntent, ShopError, ShopResult};
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe PaymentIntents gateway
pub struct StripeIntentGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeIntentGateway {
    /// Create a new Stripe gateway
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                ShopError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }

    /// Whether the configured key is a test key
    pub fn is_test_mode(&self) -> bool {
        self.config.is_test_mode()
    }
}

#[async_trait]
impl PaymentGateway for StripeIntentGateway {
    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn create_intent(&self, amount: i64, currency: Currency) -> ShopResult<PaymentIntent> {
        if amount <= 0 {
            return Err(ShopError::InvalidRequest(format!(
                "payment amount must be positive, got {}",
                amount
            )));
        }

        let form_params = [
            ("amount", amount.to_string()),
            ("currency", currency.as_str().to_string()),
            ("payment_method_types[]", "card".to_string()),
        ];

        debug!("Creating Stripe payment intent: amount={} {}", amount, currency);

        let url = format!("{}/v1/payment_intents", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .form(&form_params)
            .send()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            // Parse Stripe error
            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(ShopError::PaymentGateway {
                    provider: PROVIDER.to_string(),
                    message: error_response.error.message,
                });
            }

            return Err(ShopError::PaymentGateway {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let intent: StripePaymentIntentResponse = serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        info!("Created Stripe payment intent: id={}", intent.id);

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    client_secret: String,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway_for(server: &MockServer) -> StripeIntentGateway {
        let config = StripeConfig::new("sk_test_abc123").with_api_base_url(server.uri());
        StripeIntentGateway::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_create_intent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("authorization", "Bearer sk_test_abc123"))
            .and(body_string_contains("amount=1999"))
            .and(body_string_contains("currency=usd"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_123",
                "object": "payment_intent",
                "amount": 1999,
                "currency": "usd",
                "client_secret": "pi_123_secret_456",
                "status": "requires_payment_method"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway_for(&server).await;
        let intent = gateway.create_intent(1999, Currency::USD).await.unwrap();

        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret, "pi_123_secret_456");
        assert_eq!(intent.amount, 1999);
        assert_eq!(intent.currency, Currency::USD);
    }

    #[tokio::test]
    async fn test_stripe_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {
                    "type": "card_error",
                    "message": "Your card was declined."
                }
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server).await;
        let err = gateway.create_intent(500, Currency::USD).await.unwrap_err();

        match err {
            ShopError::PaymentGateway { provider, message } => {
                assert_eq!(provider, "stripe");
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server).await;
        let err = gateway.create_intent(500, Currency::USD).await.unwrap_err();
        assert_eq!(err.status_code(), 502);
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let server = MockServer::start().await;
        let gateway = gateway_for(&server).await;

        let err = gateway.create_intent(0, Currency::USD).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_network_error() {
        let config = StripeConfig::new("sk_test_abc123").with_api_base_url("http://127.0.0.1:1");
        let gateway = StripeIntentGateway::new(config).unwrap();

        let err = gateway.create_intent(100, Currency::USD).await.unwrap_err();
        assert_eq!(err.status_code(), 503);
    }
}
