//! # Purchase Types
//!
//! Purchases, payment confirmations and the payment records written when a
//! purchase is paid.

use crate::error::{ShopError, ShopResult};
use crate::product::Product;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Ordered, awaiting payment
    #[default]
    Pending,
    /// Payment confirmed
    Paid,
    /// Dispatched by an admin
    Shipped,
    /// Cancelled by an admin
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Paid => "paid",
            PurchaseStatus::Shipped => "shipped",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored purchase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Purchase {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Purchased product
    pub product_id: String,

    /// Product name (denormalized for display)
    pub product_name: String,

    /// Buyer
    pub user_email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    pub quantity: u32,

    /// Unit price snapshot
    pub price: f64,

    /// price * quantity
    pub total: f64,

    pub status: PurchaseStatus,

    pub paid: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Purchase {
    /// Check if `email` placed this purchase
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.user_email == email
    }
}

/// Body of `POST /product` (records a purchase)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPurchase {
    pub product_id: String,
    pub product_name: String,
    pub user_email: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub quantity: u32,
    pub price: f64,
}

impl NewPurchase {
    pub fn validate(&self) -> ShopResult<()> {
        if self.product_id.trim().is_empty() {
            return Err(ShopError::InvalidRequest("productId is required".to_string()));
        }
        if self.user_email.trim().is_empty() {
            return Err(ShopError::InvalidRequest("userEmail is required".to_string()));
        }
        if self.quantity == 0 {
            return Err(ShopError::InvalidRequest(
                "quantity must be at least 1".to_string(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ShopError::InvalidRequest(format!(
                "invalid price: {}",
                self.price
            )));
        }
        Ok(())
    }

    /// Build the stored purchase: pending, unpaid, total computed in cents
    pub fn into_purchase(self, now: DateTime<Utc>) -> Purchase {
        let total = (self.price * f64::from(self.quantity) * 100.0).round() / 100.0;
        Purchase {
            id: None,
            product_id: self.product_id,
            product_name: self.product_name,
            user_email: self.user_email,
            user_name: self.user_name,
            quantity: self.quantity,
            price: self.price,
            total,
            status: PurchaseStatus::Pending,
            paid: false,
            transaction_id: None,
            created_at: Some(now),
        }
    }
}

/// Body of `PATCH /purcahses/:id` (payment confirmation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PaymentConfirmation {
    pub product_id: String,
    /// Product as the buyer saw it when paying
    pub product: Product,
    pub status: PurchaseStatus,
    pub transaction_id: String,
}

impl PaymentConfirmation {
    pub fn validate(&self) -> ShopResult<()> {
        if self.transaction_id.trim().is_empty() {
            return Err(ShopError::InvalidRequest(
                "transactionId is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Payment record for the given purchase
    pub fn to_record(&self, purchase_id: &str, now: DateTime<Utc>) -> PaymentRecord {
        PaymentRecord {
            id: None,
            purchase_id: purchase_id.to_string(),
            product_id: self.product_id.clone(),
            product: self.product.clone(),
            status: self.status,
            transaction_id: self.transaction_id.clone(),
            created_at: Some(now),
        }
    }

    /// Fields written onto the purchase once paid
    pub fn purchase_patch(&self) -> PaidPatch {
        PaidPatch {
            paid: true,
            status: self.status,
            transaction_id: self.transaction_id.clone(),
        }
    }
}

/// `$set` patch applied to a purchase on payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidPatch {
    pub paid: bool,
    pub status: PurchaseStatus,
    pub transaction_id: String,
}

/// Body of `PUT /purchases/:id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdate {
    pub status: PurchaseStatus,
}

/// Snapshot of a completed payment (append-only)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub purchase_id: String,
    pub product_id: String,
    /// Product snapshot
    pub product: Product,
    pub status: PurchaseStatus,
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
