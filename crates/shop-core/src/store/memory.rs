//! In-memory DocumentStore implementation

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    apply_patch, ensure_id, upsert_document, Collection, DeleteResult, Document, DocumentStore,
    Filter, InsertResult, UpdateResult, ID_FIELD,
};
use crate::error::{ShopError, ShopResult};

/// In-memory document store. Collections keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
    ) -> ShopResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let docs = collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.map_or(true, |f| f.matches(doc)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> ShopResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut doc: Document,
    ) -> ShopResult<InsertResult> {
        let id = ensure_id(&mut doc);
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        let id_filter = Filter::id(id.as_str());
        if docs.iter().any(|existing| id_filter.matches(existing)) {
            return Err(ShopError::Store(format!(
                "duplicate {} in {}: {}",
                ID_FIELD, collection, id
            )));
        }

        docs.push(doc);
        Ok(InsertResult::new(id))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Document,
        upsert: bool,
    ) -> ShopResult<UpdateResult> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        if let Some(doc) = docs.iter_mut().find(|doc| filter.matches(doc)) {
            let modified = apply_patch(doc, &patch);
            return Ok(UpdateResult::matched(modified));
        }

        if !upsert {
            return Ok(UpdateResult::unmatched());
        }

        let (id, doc) = upsert_document(filter, &patch);
        docs.push(doc);
        Ok(UpdateResult::upserted(id))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> ShopResult<DeleteResult> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(DeleteResult::new(0));
        };

        match docs.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                docs.remove(index);
                Ok(DeleteResult::new(1))
            }
            None => Ok(DeleteResult::new(0)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
