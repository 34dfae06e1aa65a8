//! # shop-core
//!
//! Core types and traits for the lukas-shop backend.
//!
//! This crate provides:
//! - `DocumentStore` trait with in-memory and SQLite backends
//! - `Storage`, the typed gateway over the six shop collections
//! - `Product`, `Purchase`, `PaymentRecord`, `User`, `UserProfile`, `Review` records
//! - `TokenService` for signed bearer tokens
//! - `PaymentGateway` trait for payment providers
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{MemoryStore, Storage, TokenService};
//! use std::sync::Arc;
//!
//! let storage = Storage::new(Arc::new(MemoryStore::new()));
//! storage.upsert_user("new@x.com", Default::default()).await?;
//!
//! let tokens = TokenService::new("secret", chrono::Duration::hours(1))?;
//! let token = tokens.issue("new@x.com")?;
//! assert_eq!(tokens.verify(&token)?.email, "new@x.com");
//! ```

pub mod error;
pub mod gateway;
pub mod payment;
pub mod product;
pub mod purchase;
pub mod review;
pub mod store;
pub mod token;
pub mod user;

// Re-exports for convenience
pub use error::{ShopError, ShopResult};
pub use gateway::{PaymentConfirmed, Storage};
pub use payment::{BoxedPaymentGateway, IntentRequest, PaymentGateway, PaymentIntent};
pub use product::{Currency, NewProduct, Product, ProductCatalog, Restock};
pub use purchase::{
    NewPurchase, PaymentConfirmation, PaymentRecord, Purchase, PurchaseStatus, StatusUpdate,
};
pub use review::{NewReview, Review};
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
pub use store::{
    Collection, DeleteResult, Document, DocumentStore, Filter, InsertResult, MemoryStore,
    SharedStore, UpdateResult,
};
pub use token::{Claims, TokenError, TokenService};
pub use user::{ProfileUpdate, Role, User, UserProfile, UserUpdate};
