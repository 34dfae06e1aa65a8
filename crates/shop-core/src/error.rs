//! # Shop Error Types
//!
//! Typed error handling for lukas-shop.
//! All storage, token and payment operations return `Result<T, ShopError>`.

use thiserror::Error;

use crate::store::Collection;
use crate::token::TokenError;

/// Core error type for all shop operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// No credential was presented
    #[error("Unauthorized access")]
    Unauthorized,

    /// Credential was rejected or the caller lacks the required role
    #[error("Forbidden access: {0}")]
    Forbidden(String),

    /// Document missing from a collection
    #[error("Not found in {collection}: {key}")]
    NotFound { collection: Collection, key: String },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Document store fault
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors (missing keys, invalid values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    PaymentGateway { provider: String, message: String },

    /// Network/HTTP error communicating with the payment provider
    #[error("Network error: {0}")]
    Network(String),
}

impl ShopError {
    /// Shorthand for a missing document
    pub fn not_found(collection: Collection, key: impl Into<String>) -> Self {
        ShopError::NotFound {
            collection,
            key: key.into(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Unauthorized => 401,
            ShopError::Forbidden(_) => 403,
            ShopError::NotFound { .. } => 404,
            ShopError::InvalidRequest(_) => 400,
            ShopError::Store(_) => 500,
            ShopError::Serialization(_) => 500,
            ShopError::Configuration(_) => 500,
            ShopError::PaymentGateway { .. } => 502,
            ShopError::Network(_) => 503,
        }
    }
}

impl From<TokenError> for ShopError {
    fn from(err: TokenError) -> Self {
        ShopError::Forbidden(err.to_string())
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

/// Result type alias for shop operations
pub type ShopResult<T> = Result<T, ShopError>;
