//! # Routes
//!
//! Axum router configuration for the shop API.
//! Paths are part of the public contract, `/purcahses` spelling included.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Gates are declared on the handlers themselves:
/// - `Authenticated`: bearer token required
/// - `AdminUser`: bearer token of a user with the admin role
pub fn create_router(state: AppState) -> Router {
    // The storefront is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let product_routes = Router::new()
        .route(
            "/product",
            get(handlers::list_products).post(handlers::create_purchase),
        )
        .route(
            "/product/{id}",
            get(handlers::get_product)
                .put(handlers::restock_product)
                .delete(handlers::delete_product),
        )
        .route("/uploadProduct", post(handlers::upload_product));

    let purchase_routes = Router::new()
        .route("/purcahses", get(handlers::purchases_by_email))
        .route(
            "/purcahses/{id}",
            get(handlers::get_purchase)
                .delete(handlers::delete_purchase)
                .patch(handlers::confirm_payment),
        )
        .route("/purchases", get(handlers::list_purchases))
        .route("/purchases/{id}", put(handlers::update_purchase_status));

    let user_routes = Router::new()
        .route("/user", get(handlers::list_users))
        .route("/user/{email}", put(handlers::upsert_user))
        .route("/user/admin/{email}", put(handlers::make_admin))
        .route("/admin/{email}", get(handlers::check_admin))
        .route(
            "/userProfile/{email}",
            get(handlers::get_profile).put(handlers::upsert_profile),
        );

    let review_routes = Router::new().route(
        "/review",
        get(handlers::list_reviews).post(handlers::create_review),
    );

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/create-payment-intent",
            post(handlers::create_payment_intent),
        )
        .merge(product_routes)
        .merge(purchase_routes)
        .merge(user_routes)
        .merge(review_routes)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        // State
        .with_state(state)
}
