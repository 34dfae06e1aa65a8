//! # Bearer Tokens
//!
//! Signed, time-limited access tokens keyed by email.
//!
//! Tokens use the JWT compact form with an HS256 signature, so any standard
//! JWT client library can decode them:
//!
//! ```text
//! base64url({"alg":"HS256","typ":"JWT"}) . base64url({email, iat, exp}) . base64url(hmac)
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::error::{ShopError, ShopResult};

type HmacSha256 = Hmac<Sha256>;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;
const ALGORITHM: &str = "HS256";

/// Reasons a token can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not a well-formed token
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Signature does not match the payload
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token lifetime has elapsed
    #[error("Token expired")]
    Expired,
}

/// Decoded token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity asserted by the token
    pub email: String,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Issues and verifies bearer tokens with a shared secret
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    /// Create a token service. The secret must be non-empty and the ttl positive.
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> ShopResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ShopError::Configuration(
                "token signing secret is empty".to_string(),
            ));
        }
        if ttl <= Duration::zero() {
            return Err(ShopError::Configuration(format!(
                "token ttl must be positive, got {}s",
                ttl.num_seconds()
            )));
        }
        Ok(Self { secret, ttl })
    }

    /// Issue a token for `email`, valid from now for the configured ttl
    pub fn issue(&self, email: &str) -> ShopResult<String> {
        self.issue_at(email, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, email: &str, now: DateTime<Utc>) -> ShopResult<String> {
        let exp = now.checked_add_signed(self.ttl).ok_or_else(|| {
            ShopError::Configuration(format!(
                "token ttl of {}h overflows the clock",
                self.ttl.num_hours()
            ))
        })?;
        let claims = Claims {
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let header = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{}.{}", header, payload);

        let mut mac = self.mac().ok_or_else(|| {
            ShopError::Configuration("token signing secret rejected".to_string())
        })?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Verify a token's signature and expiry, returning its claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed("expected three segments".to_string()));
        };

        let header_json = decode_segment(header)?;
        let parsed: TokenHeader = serde_json::from_slice(&header_json)
            .map_err(|e| TokenError::Malformed(format!("header: {}", e)))?;
        if parsed.alg != ALGORITHM {
            return Err(TokenError::Malformed(format!(
                "unsupported algorithm {}",
                parsed.alg
            )));
        }

        let signature = decode_segment(signature)?;
        let mut mac = self.mac().ok_or(TokenError::InvalidSignature)?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        // verify_slice compares in constant time
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: Claims = serde_json::from_slice(&decode_segment(payload)?)
            .map_err(|e| TokenError::Malformed(format!("payload: {}", e)))?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).ok()
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(e.to_string()))
}
