//! # shop-stripe
//!
//! Stripe payment gateway for lukas-shop.
//!
//! Creates PaymentIntents for the amount a buyer is about to pay and hands
//! back the client secret the storefront needs to confirm the card payment.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_stripe::StripeIntentGateway;
//! use shop_core::{Currency, PaymentGateway};
//!
//! // Create gateway from environment
//! let gateway = StripeIntentGateway::from_env()?;
//!
//! // $19.99
//! let intent = gateway.create_intent(1999, Currency::USD).await?;
//!
//! // Return intent.client_secret to the browser
//! ```

pub mod config;
pub mod intent;

// Re-exports
pub use config::StripeConfig;
pub use intent::StripeIntentGateway;
