//! # Payment Gateway Trait
//!
//! Strategy trait for payment providers that can create payment intents.
//! Implementations: Stripe (`shop-stripe`), test doubles.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │        PaymentGateway (trait)            │
//! │  ├── create_intent(amount, currency)     │
//! │  └── provider_name()                     │
//! └──────────────────────────────────────────┘
//!                     ▲
//!          ┌──────────┴──────────┐
//!  ┌───────┴────────┐   ┌────────┴───────┐
//!  │ StripeIntent   │   │  test gateway  │
//!  │   Gateway      │   │                │
//!  └────────────────┘   └────────────────┘
//! ```

use crate::error::{ShopError, ShopResult};
use crate::product::Currency;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A payment intent created by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Provider's intent ID
    pub id: String,
    /// Secret the browser uses to confirm the payment
    pub client_secret: String,
    /// Amount in the smallest currency unit
    pub amount: i64,
    pub currency: Currency,
}

/// Core trait for payment provider implementations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for `amount` minor units of `currency`.
    async fn create_intent(&self, amount: i64, currency: Currency) -> ShopResult<PaymentIntent>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed payment gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// Body of `POST /create-payment-intent`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IntentRequest {
    /// Price in major currency units
    pub pay_price: f64,
}

impl IntentRequest {
    /// Amount to charge in minor units of `currency`
    pub fn amount_in(&self, currency: Currency) -> ShopResult<i64> {
        if !self.pay_price.is_finite() || self.pay_price <= 0.0 {
            return Err(ShopError::InvalidRequest(format!(
                "payPrice must be a positive amount, got {}",
                self.pay_price
            )));
        }
        Ok(currency.to_smallest_unit(self.pay_price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_in_minor_units() {
        let request = IntentRequest { pay_price: 19.99 };
        assert_eq!(request.amount_in(Currency::USD).unwrap(), 1999);

        let request = IntentRequest { pay_price: 0.1 + 0.2 };
        assert_eq!(request.amount_in(Currency::USD).unwrap(), 30);
    }

    #[test]
    fn test_rejects_non_positive_prices() {
        assert!(IntentRequest { pay_price: 0.0 }.amount_in(Currency::USD).is_err());
        assert!(IntentRequest { pay_price: -5.0 }.amount_in(Currency::USD).is_err());
        assert!(IntentRequest {
            pay_price: f64::NAN
        }
        .amount_in(Currency::USD)
        .is_err());
    }

    #[test]
    fn test_intent_serializes_client_secret() {
        let intent = PaymentIntent {
            id: "pi_1".to_string(),
            client_secret: "pi_1_secret_abc".to_string(),
            amount: 1999,
            currency: Currency::USD,
        };
        let value = serde_json::to_value(intent).unwrap();
        assert_eq!(value["clientSecret"], "pi_1_secret_abc");
        assert_eq!(value["currency"], "usd");
    }
}
