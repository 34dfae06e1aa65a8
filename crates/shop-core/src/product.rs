//! # Product Types
//!
//! Product records, upload requests and the seed catalog.
//! The seed catalog is loaded from `config/products.toml`.

use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, the others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit (cents, etc.).
    /// Rounds to nearest so that 19.99 becomes 1999 and not 1998.
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

impl std::str::FromStr for Currency {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usd" => Ok(Currency::USD),
            "eur" => Ok(Currency::EUR),
            "gbp" => Ok(Currency::GBP),
            "jpy" => Ok(Currency::JPY),
            "cad" => Ok(Currency::CAD),
            other => Err(ShopError::Configuration(format!(
                "unsupported currency: {}",
                other
            ))),
        }
    }
}

/// A stored product.
///
/// Read leniently: a restock upsert on an unknown id creates a document that
/// only carries `available`, so every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Unit price in major currency units
    pub price: f64,

    /// Quantity in stock
    pub available: u32,

    /// Smallest quantity a buyer may order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_order: Option<u32>,
}

/// Body of `POST /uploadProduct`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub price: f64,
    pub available: u32,
    #[serde(default)]
    pub minimum_order: Option<u32>,
}

impl NewProduct {
    /// Reject blank names and negative or non-finite prices
    pub fn validate(&self) -> ShopResult<()> {
        if self.name.trim().is_empty() {
            return Err(ShopError::InvalidRequest(
                "product name must not be empty".to_string(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ShopError::InvalidRequest(format!(
                "invalid product price: {}",
                self.price
            )));
        }
        Ok(())
    }

    /// Convert into a stored product (id assigned by the store)
    pub fn into_product(self) -> Product {
        Product {
            id: None,
            name: self.name,
            description: self.description,
            image: self.image,
            price: self.price,
            available: self.available,
            minimum_order: self.minimum_order,
        }
    }
}

/// Body of `PUT /product/:id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Restock {
    pub available: u32,
}

/// Seed catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

impl ProductCatalog {
    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
