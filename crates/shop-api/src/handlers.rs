//! # Request Handlers
//!
//! Axum request handlers for the shop API.
//! Each handler passes its gates, then makes one storage or payment call.

use crate::auth::{require_owner_or_admin, AdminUser, Authenticated};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Query, Request, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use shop_core::{
    DeleteResult, InsertResult, IntentRequest, NewProduct, NewPurchase, NewReview,
    PaymentConfirmation, PaymentConfirmed, Product, ProfileUpdate, Purchase, Restock, Review,
    ShopError, StatusUpdate, UpdateResult, User, UserProfile, UserUpdate,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

pub type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub fn shop_error_to_response(err: ShopError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    if code >= 500 {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// JSON request body.
///
/// Malformed bodies, unknown fields and type mismatches are all rejected
/// with 400 and an [`ErrorResponse`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(shop_error_to_response(ShopError::InvalidRequest(
                rejection.body_text(),
            ))),
        }
    }
}

/// Query of `GET /purcahses`
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// Response of `PUT /user/:email`
#[derive(Debug, Serialize, Deserialize)]
pub struct UserUpsertResponse {
    pub result: UpdateResult,
    pub token: String,
}

/// Response of `GET /admin/:email`
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminStatus {
    pub admin: bool,
}

/// Response of `POST /create-payment-intent`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSecretResponse {
    pub client_secret: String,
}

// =============================================================================
// Health
// =============================================================================

pub async fn root() -> &'static str {
    "Lukas server is running"
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "lukas-shop",
        "version": env!("CARGO_PKG_VERSION"),
        "store": state.storage.backend_name(),
    }))
}

// =============================================================================
// Products
// =============================================================================

pub async fn list_products(State(state): State<AppState>) -> HandlerResult<Vec<Product>> {
    let products = state
        .storage
        .list_products()
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(id): Path<String>,
) -> HandlerResult<Product> {
    let product = state
        .storage
        .product(&id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(product))
}

/// Record a purchase of a product
#[instrument(skip(state, request), fields(product_id = %request.product_id))]
pub async fn create_purchase(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<NewPurchase>,
) -> HandlerResult<InsertResult> {
    request.validate().map_err(shop_error_to_response)?;
    let purchase = request.into_purchase(Utc::now());
    let result = state
        .storage
        .insert_purchase(purchase)
        .await
        .map_err(shop_error_to_response)?;

    info!("Recorded purchase {}", result.inserted_id);
    Ok(Json(result))
}

pub async fn restock_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<Restock>,
) -> HandlerResult<UpdateResult> {
    let result = state
        .storage
        .restock_product(&id, request)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(result))
}

pub async fn delete_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> HandlerResult<DeleteResult> {
    let result = state
        .storage
        .delete_product(&id)
        .await
        .map_err(shop_error_to_response)?;

    info!("{} deleted product {} ({})", admin.email, id, result.deleted_count);
    Ok(Json(result))
}

pub async fn upload_product(
    State(state): State<AppState>,
    _caller: Authenticated,
    JsonBody(request): JsonBody<NewProduct>,
) -> HandlerResult<InsertResult> {
    let result = state
        .storage
        .insert_product(request)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(result))
}

// =============================================================================
// Purchases
// =============================================================================

/// Purchases of the calling user
pub async fn purchases_by_email(
    State(state): State<AppState>,
    caller: Authenticated,
    Query(query): Query<EmailQuery>,
) -> HandlerResult<Vec<Purchase>> {
    if caller.email != query.email {
        return Err(shop_error_to_response(ShopError::Forbidden(format!(
            "{} may not list purchases of {}",
            caller.email, query.email
        ))));
    }

    let purchases = state
        .storage
        .purchases_for(&query.email)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(purchases))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(id): Path<String>,
) -> HandlerResult<Purchase> {
    let purchase = state
        .storage
        .purchase(&id)
        .await
        .map_err(shop_error_to_response)?;
    require_owner_or_admin(&state, &caller, purchase.is_owned_by(&caller.email))
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(purchase))
}

pub async fn delete_purchase(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(id): Path<String>,
) -> HandlerResult<DeleteResult> {
    let purchase = state
        .storage
        .purchase(&id)
        .await
        .map_err(shop_error_to_response)?;
    require_owner_or_admin(&state, &caller, purchase.is_owned_by(&caller.email))
        .await
        .map_err(shop_error_to_response)?;

    let result = state
        .storage
        .delete_purchase(&id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(result))
}

/// Record a payment and mark the purchase paid
#[instrument(skip(state, request), fields(transaction_id = %request.transaction_id))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<PaymentConfirmation>,
) -> HandlerResult<PaymentConfirmed> {
    let confirmed = state
        .storage
        .confirm_payment(&id, request)
        .await
        .map_err(shop_error_to_response)?;

    info!("Purchase {} marked paid", id);
    Ok(Json(confirmed))
}

pub async fn list_purchases(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> HandlerResult<Vec<Purchase>> {
    let purchases = state
        .storage
        .list_purchases()
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(purchases))
}

pub async fn update_purchase_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<StatusUpdate>,
) -> HandlerResult<UpdateResult> {
    let result = state
        .storage
        .set_purchase_status(&id, request.status)
        .await
        .map_err(shop_error_to_response)?;

    info!(
        "{} set purchase {} to {}",
        admin.email,
        id,
        request.status.as_str()
    );
    Ok(Json(result))
}

// =============================================================================
// Reviews
// =============================================================================

pub async fn create_review(
    State(state): State<AppState>,
    caller: Authenticated,
    JsonBody(request): JsonBody<NewReview>,
) -> HandlerResult<InsertResult> {
    let result = state
        .storage
        .insert_review(&caller.email, request)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(result))
}

pub async fn list_reviews(State(state): State<AppState>) -> HandlerResult<Vec<Review>> {
    let reviews = state
        .storage
        .list_reviews()
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(reviews))
}

// =============================================================================
// Users
// =============================================================================

/// Create or update a user, then hand out a fresh token
#[instrument(skip(state, request))]
pub async fn upsert_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
    JsonBody(request): JsonBody<UserUpdate>,
) -> HandlerResult<UserUpsertResponse> {
    if email.trim().is_empty() {
        return Err(shop_error_to_response(ShopError::InvalidRequest(
            "email must not be empty".to_string(),
        )));
    }

    let result = state
        .storage
        .upsert_user(&email, request)
        .await
        .map_err(shop_error_to_response)?;
    let token = state
        .tokens
        .issue(&email)
        .map_err(shop_error_to_response)?;

    Ok(Json(UserUpsertResponse { result, token }))
}

pub async fn list_users(
    State(state): State<AppState>,
    _caller: Authenticated,
) -> HandlerResult<Vec<User>> {
    let users = state
        .storage
        .list_users()
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(users))
}

pub async fn check_admin(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> HandlerResult<AdminStatus> {
    let admin = state
        .storage
        .is_admin(&email)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(AdminStatus { admin }))
}

pub async fn make_admin(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(email): Path<String>,
) -> HandlerResult<UpdateResult> {
    let result = state
        .storage
        .make_admin(&email)
        .await
        .map_err(shop_error_to_response)?;

    info!("{} promoted {} to admin", admin.email, email);
    Ok(Json(result))
}

// =============================================================================
// Profiles
// =============================================================================

pub async fn get_profile(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(email): Path<String>,
) -> HandlerResult<UserProfile> {
    let profile = state
        .storage
        .profile(&email)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(profile))
}

pub async fn upsert_profile(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(email): Path<String>,
    JsonBody(request): JsonBody<ProfileUpdate>,
) -> HandlerResult<UpdateResult> {
    require_owner_or_admin(&state, &caller, caller.email == email)
        .await
        .map_err(shop_error_to_response)?;

    let result = state
        .storage
        .upsert_profile(&email, request)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(result))
}

// =============================================================================
// Payments
// =============================================================================

/// Create a payment intent for the buyer's total
#[instrument(skip(state, caller, request))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    caller: Authenticated,
    JsonBody(request): JsonBody<IntentRequest>,
) -> HandlerResult<ClientSecretResponse> {
    let amount = request
        .amount_in(state.config.currency)
        .map_err(shop_error_to_response)?;

    let intent = state
        .payments
        .create_intent(amount, state.config.currency)
        .await
        .map_err(shop_error_to_response)?;

    info!(
        "Created payment intent {} for {} ({} {})",
        intent.id, caller.email, intent.amount, intent.currency
    );
    Ok(Json(ClientSecretResponse {
        client_secret: intent.client_secret,
    }))
}
