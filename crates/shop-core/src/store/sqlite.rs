//! SQLite implementation of DocumentStore
//!
//! Every collection shares one `documents` table; the document body is stored
//! as JSON text and field filters go through `json_extract`.

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{
    apply_patch, ensure_id, upsert_document, Collection, DeleteResult, Document, DocumentStore,
    Filter, InsertResult, UpdateResult,
};
use crate::error::{ShopError, ShopResult};

impl From<rusqlite::Error> for ShopError {
    fn from(err: rusqlite::Error) -> Self {
        ShopError::Store(err.to_string())
    }
}

/// Persistent document store on a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> ShopResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!("Opened SQLite store at {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> ShopResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> ShopResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> ShopResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ShopError::Store("SQLite connection lock poisoned".to_string()))
    }
}

fn init_schema(conn: &Connection) -> ShopResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            UNIQUE (collection, id)
        );

        CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
        "#,
    )?;
    Ok(())
}

/// Rows matching the filter as `(rowid, document)`, in insertion order
fn select_rows(
    conn: &Connection,
    collection: Collection,
    filter: Option<&Filter>,
    limit: Option<u32>,
) -> ShopResult<Vec<(i64, Document)>> {
    let mut sql = String::from("SELECT rowid, body FROM documents WHERE collection = ?1");
    let mut args = vec![collection.as_str().to_string()];

    match filter {
        None => {}
        Some(Filter::Id(id)) => {
            sql.push_str(" AND id = ?2");
            args.push(id.clone());
        }
        Some(Filter::Field { name, value }) => {
            sql.push_str(" AND json_extract(body, ?2) = ?3");
            args.push(format!("$.{}", name));
            args.push(value.clone());
        }
    }

    sql.push_str(" ORDER BY rowid");
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(rowid, body)| -> ShopResult<(i64, Document)> {
            Ok((rowid, serde_json::from_str(&body)?))
        })
        .collect()
}

fn insert_row(conn: &Connection, collection: Collection, id: &str, doc: &Document) -> ShopResult<()> {
    conn.execute(
        "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
        params![collection.as_str(), id, serde_json::to_string(doc)?],
    )?;
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
    ) -> ShopResult<Vec<Document>> {
        let conn = self.conn()?;
        let rows = select_rows(&conn, collection, filter, None)?;
        Ok(rows.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> ShopResult<Option<Document>> {
        let conn = self.conn()?;
        let rows = select_rows(&conn, collection, Some(filter), Some(1))?;
        Ok(rows.into_iter().next().map(|(_, doc)| doc))
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut doc: Document,
    ) -> ShopResult<InsertResult> {
        let id = ensure_id(&mut doc);
        let conn = self.conn()?;
        insert_row(&conn, collection, &id, &doc)?;
        Ok(InsertResult::new(id))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Document,
        upsert: bool,
    ) -> ShopResult<UpdateResult> {
        // The connection lock spans the read and the write.
        let conn = self.conn()?;
        let existing = select_rows(&conn, collection, Some(filter), Some(1))?;

        if let Some((rowid, mut doc)) = existing.into_iter().next() {
            let modified = apply_patch(&mut doc, &patch);
            if modified {
                conn.execute(
                    "UPDATE documents SET body = ?1 WHERE rowid = ?2",
                    params![serde_json::to_string(&doc)?, rowid],
                )?;
            }
            return Ok(UpdateResult::matched(modified));
        }

        if !upsert {
            return Ok(UpdateResult::unmatched());
        }

        let (id, doc) = upsert_document(filter, &patch);
        insert_row(&conn, collection, &id, &doc)?;
        Ok(UpdateResult::upserted(id))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> ShopResult<DeleteResult> {
        let conn = self.conn()?;
        let existing = select_rows(&conn, collection, Some(filter), Some(1))?;

        match existing.into_iter().next() {
            Some((rowid, _)) => {
                let deleted = conn.execute("DELETE FROM documents WHERE rowid = ?1", params![rowid])?;
                Ok(DeleteResult::new(deleted as u64))
            }
            None => Ok(DeleteResult::new(0)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
