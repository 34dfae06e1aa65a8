//! # shop-api
//!
//! HTTP API layer for lukas-shop.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Bearer-token and admin gates as extractors
//! - REST endpoints for products, purchases, reviews, users and payments
//!
//! ## Endpoints
//!
//! | Method | Path | Gates |
//! |--------|------|-------|
//! | GET | `/` | |
//! | GET | `/health` | |
//! | GET | `/product` | |
//! | GET | `/product/{id}` | auth |
//! | POST | `/product` | |
//! | PUT | `/product/{id}` | |
//! | DELETE | `/product/{id}` | admin |
//! | POST | `/uploadProduct` | auth |
//! | GET | `/purcahses?email=` | auth, own email |
//! | GET | `/purcahses/{id}` | auth, owner or admin |
//! | DELETE | `/purcahses/{id}` | auth, owner or admin |
//! | PATCH | `/purcahses/{id}` | |
//! | GET | `/purchases` | admin |
//! | PUT | `/purchases/{id}` | admin |
//! | POST | `/review` | auth |
//! | GET | `/review` | |
//! | PUT | `/user/{email}` | |
//! | GET | `/user` | auth |
//! | GET | `/admin/{email}` | |
//! | PUT | `/user/admin/{email}` | admin |
//! | GET | `/userProfile/{email}` | auth |
//! | PUT | `/userProfile/{email}` | auth, owner or admin |
//! | POST | `/create-payment-intent` | auth |

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, LogFormat};
