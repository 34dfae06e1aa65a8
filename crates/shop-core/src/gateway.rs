//! # Storage Gateway
//!
//! Typed accessors over the six shop collections. Handlers only talk to
//! [`Storage`]; it converts typed records to documents and back, and turns
//! missing documents into [`ShopError::NotFound`] where a record is required.

use crate::error::{ShopError, ShopResult};
use crate::product::{NewProduct, Product, ProductCatalog, Restock};
use crate::purchase::{PaymentConfirmation, Purchase, PurchaseStatus, StatusUpdate};
use crate::review::{NewReview, Review};
use crate::store::{
    Collection, DeleteResult, Document, Filter, InsertResult, SharedStore, UpdateResult,
};
use crate::user::{ProfileUpdate, Role, RolePatch, User, UserProfile, UserUpdate};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

const EMAIL: &str = "email";
const USER_EMAIL: &str = "userEmail";

/// Outcome of a payment confirmation: the record insert, then the purchase update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmed {
    pub payment: InsertResult,
    pub purchase: UpdateResult,
}

/// Typed storage over a shared document store
#[derive(Clone)]
pub struct Storage {
    store: SharedStore,
}

impl Storage {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Backend name (for logging)
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    // ========== Products ==========

    pub async fn list_products(&self) -> ShopResult<Vec<Product>> {
        self.find_all(Collection::Products, None).await
    }

    pub async fn product(&self, id: &str) -> ShopResult<Product> {
        self.find_required(Collection::Products, &Filter::id(id)).await
    }

    pub async fn insert_product(&self, product: NewProduct) -> ShopResult<InsertResult> {
        product.validate()?;
        self.store
            .insert_one(Collection::Products, to_document(&product.into_product())?)
            .await
    }

    /// Set a product's stock, creating the document when the id is unknown
    pub async fn restock_product(&self, id: &str, restock: Restock) -> ShopResult<UpdateResult> {
        self.store
            .update_one(
                Collection::Products,
                &Filter::id(id),
                to_document(&restock)?,
                true,
            )
            .await
    }

    pub async fn delete_product(&self, id: &str) -> ShopResult<DeleteResult> {
        self.store
            .delete_one(Collection::Products, &Filter::id(id))
            .await
    }

    /// Insert the catalog's products when the products collection is empty.
    /// Returns how many were inserted.
    pub async fn seed_catalog(&self, catalog: ProductCatalog) -> ShopResult<usize> {
        let existing = self.store.find(Collection::Products, None).await?;
        if !existing.is_empty() {
            debug!(
                "Skipping catalog seed, {} products already stored",
                existing.len()
            );
            return Ok(0);
        }

        let mut inserted = 0;
        for product in catalog.products {
            if let Err(e) = product.validate() {
                warn!("Skipping catalog entry {:?}: {}", product.name, e);
                continue;
            }
            self.store
                .insert_one(Collection::Products, to_document(&product.into_product())?)
                .await?;
            inserted += 1;
        }
        Ok(inserted)
    }

    // ========== Purchases ==========

    pub async fn insert_purchase(&self, purchase: Purchase) -> ShopResult<InsertResult> {
        self.store
            .insert_one(Collection::Purchases, to_document(&purchase)?)
            .await
    }

    pub async fn purchases_for(&self, email: &str) -> ShopResult<Vec<Purchase>> {
        self.find_all(Collection::Purchases, Some(&Filter::field(USER_EMAIL, email)))
            .await
    }

    pub async fn list_purchases(&self) -> ShopResult<Vec<Purchase>> {
        self.find_all(Collection::Purchases, None).await
    }

    pub async fn purchase(&self, id: &str) -> ShopResult<Purchase> {
        self.find_required(Collection::Purchases, &Filter::id(id))
            .await
    }

    pub async fn delete_purchase(&self, id: &str) -> ShopResult<DeleteResult> {
        self.store
            .delete_one(Collection::Purchases, &Filter::id(id))
            .await
    }

    /// Record a payment, then mark the purchase paid.
    ///
    /// The two writes are independent: a failure between them leaves the
    /// payment record without the purchase update.
    pub async fn confirm_payment(
        &self,
        purchase_id: &str,
        confirmation: PaymentConfirmation,
    ) -> ShopResult<PaymentConfirmed> {
        confirmation.validate()?;
        let filter = Filter::id(purchase_id);
        if self
            .store
            .find_one(Collection::Purchases, &filter)
            .await?
            .is_none()
        {
            return Err(ShopError::not_found(Collection::Purchases, purchase_id));
        }

        let record = confirmation.to_record(purchase_id, Utc::now());
        let payment = self
            .store
            .insert_one(Collection::Payments, to_document(&record)?)
            .await?;

        let purchase = self
            .store
            .update_one(
                Collection::Purchases,
                &filter,
                to_document(&confirmation.purchase_patch())?,
                false,
            )
            .await?;

        Ok(PaymentConfirmed { payment, purchase })
    }

    pub async fn set_purchase_status(
        &self,
        id: &str,
        status: PurchaseStatus,
    ) -> ShopResult<UpdateResult> {
        let result = self
            .store
            .update_one(
                Collection::Purchases,
                &Filter::id(id),
                to_document(&StatusUpdate { status })?,
                false,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(ShopError::not_found(Collection::Purchases, id));
        }
        Ok(result)
    }

    // ========== Reviews ==========

    pub async fn insert_review(&self, author: &str, review: NewReview) -> ShopResult<InsertResult> {
        review.validate()?;
        let review = review.into_review(author, Utc::now());
        self.store
            .insert_one(Collection::Reviews, to_document(&review)?)
            .await
    }

    pub async fn list_reviews(&self) -> ShopResult<Vec<Review>> {
        self.find_all(Collection::Reviews, None).await
    }

    // ========== Users ==========

    /// Create or update the user with this email
    pub async fn upsert_user(&self, email: &str, update: UserUpdate) -> ShopResult<UpdateResult> {
        let mut patch = to_document(&update)?;
        patch.insert(EMAIL.to_string(), Value::String(email.to_string()));
        self.store
            .update_one(Collection::Users, &Filter::field(EMAIL, email), patch, true)
            .await
    }

    pub async fn list_users(&self) -> ShopResult<Vec<User>> {
        self.find_all(Collection::Users, None).await
    }

    pub async fn find_user(&self, email: &str) -> ShopResult<Option<User>> {
        self.store
            .find_one(Collection::Users, &Filter::field(EMAIL, email))
            .await?
            .map(from_document)
            .transpose()
    }

    /// Whether `email` belongs to an admin. Unknown users are not admins.
    pub async fn is_admin(&self, email: &str) -> ShopResult<bool> {
        Ok(self
            .find_user(email)
            .await?
            .map(|user| user.is_admin())
            .unwrap_or(false))
    }

    /// Promote an existing user to admin
    pub async fn make_admin(&self, email: &str) -> ShopResult<UpdateResult> {
        let result = self
            .store
            .update_one(
                Collection::Users,
                &Filter::field(EMAIL, email),
                to_document(&RolePatch { role: Role::Admin })?,
                false,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(ShopError::not_found(Collection::Users, email));
        }
        Ok(result)
    }

    // ========== Profiles ==========

    pub async fn profile(&self, email: &str) -> ShopResult<UserProfile> {
        self.find_required(Collection::UserProfiles, &Filter::field(EMAIL, email))
            .await
    }

    /// Replace the profile for `email`, creating it if needed
    pub async fn upsert_profile(
        &self,
        email: &str,
        update: ProfileUpdate,
    ) -> ShopResult<UpdateResult> {
        let mut patch = to_document(&update)?;
        patch.insert(EMAIL.to_string(), Value::String(email.to_string()));
        self.store
            .update_one(
                Collection::UserProfiles,
                &Filter::field(EMAIL, email),
                patch,
                true,
            )
            .await
    }

    // ========== Helpers ==========

    async fn find_all<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
    ) -> ShopResult<Vec<T>> {
        self.store
            .find(collection, filter)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    async fn find_required<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> ShopResult<T> {
        match self.store.find_one(collection, filter).await? {
            Some(doc) => from_document(doc),
            None => Err(ShopError::not_found(collection, filter.value())),
        }
    }
}

/// Serialize a record into a document
pub fn to_document<T: Serialize>(record: &T) -> ShopResult<Document> {
    match serde_json::to_value(record)? {
        Value::Object(doc) => Ok(doc),
        other => Err(ShopError::Serialization(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Deserialize a document into a record
pub fn from_document<T: DeserializeOwned>(doc: Document) -> ShopResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
