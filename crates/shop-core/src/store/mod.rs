//! # Document Store
//!
//! The storage collaborator behind the shop: a set of named collections of
//! schema-less JSON documents with find / insert / update / delete by filter.
//!
//! Two backends implement [`DocumentStore`]:
//! - [`MemoryStore`]: in-process, used by default and in tests
//! - `SqliteStore`: persistent, behind the `sqlite` feature
//!
//! Filters are deliberately narrow: a document is selected either by its `_id`
//! or by exact string equality on one top-level field. Updates apply `$set`
//! semantics: listed fields are overwritten, everything else is left alone.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use crate::error::ShopResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// A stored document
pub type Document = serde_json::Map<String, Value>;

/// Identifier field present on every stored document
pub const ID_FIELD: &str = "_id";

/// The six collections the shop persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Products,
    Users,
    UserProfiles,
    Purchases,
    Reviews,
    Payments,
}

impl Collection {
    /// Collection name as persisted
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Users => "users",
            Collection::UserProfiles => "userProfiles",
            Collection::Purchases => "purchases",
            Collection::Reviews => "reviews",
            Collection::Payments => "payments",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects documents by identifier or by one exact-match field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Id(String),
    Field { name: &'static str, value: String },
}

impl Filter {
    pub fn id(id: impl Into<String>) -> Self {
        Filter::Id(id.into())
    }

    pub fn field(name: &'static str, value: impl Into<String>) -> Self {
        Filter::Field {
            name,
            value: value.into(),
        }
    }

    /// Name of the field this filter compares
    pub fn field_name(&self) -> &str {
        match self {
            Filter::Id(_) => ID_FIELD,
            Filter::Field { name, .. } => *name,
        }
    }

    /// Value the field must equal
    pub fn value(&self) -> &str {
        match self {
            Filter::Id(id) => id,
            Filter::Field { value, .. } => value,
        }
    }

    /// Check whether a document satisfies this filter
    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(self.field_name()).and_then(Value::as_str) == Some(self.value())
    }
}

/// Acknowledgement of an insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: String,
}

impl InsertResult {
    pub fn new(inserted_id: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            inserted_id: inserted_id.into(),
        }
    }
}

/// Acknowledgement of an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<String>,
}

impl UpdateResult {
    pub fn matched(modified: bool) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: u64::from(modified),
            upserted_id: None,
        }
    }

    pub fn upserted(id: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id.into()),
        }
    }

    pub fn unmatched() -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_id: None,
        }
    }
}

/// Acknowledgement of a delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

/// Storage collaborator for the shop.
///
/// Implementations must make `update_one` atomic with respect to other calls
/// on the same collection: the read-merge-write of an upsert may not
/// interleave with another writer.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in a collection, in insertion order, optionally filtered
    async fn find(&self, collection: Collection, filter: Option<&Filter>)
        -> ShopResult<Vec<Document>>;

    /// First document matching the filter, `None` if nothing matches
    async fn find_one(&self, collection: Collection, filter: &Filter)
        -> ShopResult<Option<Document>>;

    /// Insert a document, assigning an `_id` when it has none
    async fn insert_one(&self, collection: Collection, doc: Document) -> ShopResult<InsertResult>;

    /// Apply `$set` semantics to the first match, creating it when `upsert` is set
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Document,
        upsert: bool,
    ) -> ShopResult<UpdateResult>;

    /// Delete the first matching document
    async fn delete_one(&self, collection: Collection, filter: &Filter) -> ShopResult<DeleteResult>;

    /// Backend name (for logging)
    fn backend_name(&self) -> &'static str;
}

/// Shared handle to a document store
pub type SharedStore = Arc<dyn DocumentStore>;

/// Generate a fresh document identifier
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Ensure a document carries an `_id`, returning it
pub fn ensure_id(doc: &mut Document) -> String {
    match doc.get(ID_FIELD).and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            let id = new_id();
            doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            id
        }
    }
}

/// Overwrite the patch's fields on `doc`. Returns whether anything changed.
/// The `_id` of an existing document is never replaced.
pub fn apply_patch(doc: &mut Document, patch: &Document) -> bool {
    let mut changed = false;
    for (key, value) in patch {
        if key == ID_FIELD {
            continue;
        }
        if doc.get(key) != Some(value) {
            doc.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Build the document an upsert creates when nothing matched the filter
pub fn upsert_document(filter: &Filter, patch: &Document) -> (String, Document) {
    let mut doc = Document::new();
    let id = match filter {
        Filter::Id(id) => id.clone(),
        Filter::Field { name, value } => {
            doc.insert((*name).to_string(), Value::String(value.clone()));
            new_id()
        }
    };
    doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    apply_patch(&mut doc, patch);
    (id, doc)
}
