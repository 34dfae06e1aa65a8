//! Authentication gates.
//!
//! Gates are extractors: list them in a handler's arguments and the request
//! only reaches the handler once every gate has passed.
//!
//! ```rust,ignore
//! async fn delete_product(
//!     _admin: AdminUser,
//!     Path(id): Path<String>,
//! ) -> HandlerResult<DeleteResult> { ... }
//! ```

use crate::handlers::{shop_error_to_response, ErrorResponse};
use crate::state::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderValue, StatusCode},
    Json,
};
use shop_core::{ShopError, ShopResult};
use tracing::warn;

type Rejection = (StatusCode, Json<ErrorResponse>);

/// Caller holding a valid bearer token.
///
/// Rejects with 401 when no `Authorization` header is sent, and 403 when the
/// header is not a bearer credential or the token fails verification.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub email: String,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = Rejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map_err(shop_error_to_response)
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> ShopResult<Authenticated> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(ShopError::Unauthorized)?;

    let token = bearer_token(header).ok_or_else(|| {
        ShopError::Forbidden("authorization header is not a bearer token".to_string())
    })?;

    let claims = state.tokens.verify(token).map_err(|err| {
        warn!("Rejected bearer token: {}", err);
        ShopError::from(err)
    })?;

    Ok(Authenticated {
        email: claims.email,
    })
}

fn bearer_token(header: &HeaderValue) -> Option<&str> {
    let value = header.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Authenticated caller whose user record has the admin role.
///
/// The role is looked up on every request. Unknown users are rejected.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub email: String,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Rejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated { email } = Authenticated::from_request_parts(parts, state).await?;

        let is_admin = state
            .storage
            .is_admin(&email)
            .await
            .map_err(shop_error_to_response)?;

        if !is_admin {
            warn!("Admin route refused for {}", email);
            return Err(shop_error_to_response(ShopError::Forbidden(
                "admin role required".to_string(),
            )));
        }

        Ok(AdminUser { email })
    }
}

/// Allow the request when the caller owns the record or is an admin.
/// The admin lookup only runs for non-owners.
pub async fn require_owner_or_admin(
    state: &AppState,
    caller: &Authenticated,
    is_owner: bool,
) -> ShopResult<()> {
    if is_owner || state.storage.is_admin(&caller.email).await? {
        return Ok(());
    }
    Err(ShopError::Forbidden(format!(
        "{} may not access records of another user",
        caller.email
    )))
}
