// rsrc
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Document store backed by an SQLite database.
//!
//! All collections share a single table.  Documents are kept as JSON text and filters other than
//! the identifier are evaluated after loading the candidate rows.

use crate::db::{DbError, DbResult, DocumentStore, Filter};
use crate::model::{Document, DocumentId};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

/// Schema shared by all collections.
const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        body TEXT NOT NULL,
        UNIQUE (collection, id)
    )
";

/// Takes a raw SQLx error `e` and converts it to our generic error type.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        e if e.to_string().contains("UNIQUE constraint failed") => DbError::AlreadyExists,
        e => DbError::BackendError(e.to_string()),
    }
}

/// A database instance backed by SQLite.
#[derive(Clone)]
pub struct SqliteDb {
    /// Shared SQLite connection pool.
    pool: SqlitePool,
}

impl SqliteDb {
    /// Creates a new connection to the database described by `conn_str` and sets up its schema.
    ///
    /// In-memory databases are private to each connection so, for those, the pool is restricted
    /// to a single connection that is never recycled.
    pub async fn connect(conn_str: &str) -> DbResult<Self> {
        let options = if conn_str.contains(":memory:") {
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };
        let pool = options.connect(conn_str).await.map_err(map_sqlx_error)?;

        sqlx::query(SCHEMA).execute(&pool).await.map_err(map_sqlx_error)?;

        Ok(Self { pool })
    }

    /// Returns a handle to the collection `name`.
    pub fn collection<N: Into<String>>(&self, name: N) -> SqliteStore {
        SqliteStore { pool: self.pool.clone(), collection: name.into() }
    }
}

/// A collection of documents stored in an SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    /// Shared SQLite connection pool.
    pool: SqlitePool,

    /// Name of the collection this store operates on.
    collection: String,
}

/// Converts a `row` with `id` and `body` columns into a document.
fn row_to_document(row: &SqliteRow) -> DbResult<Document> {
    let id: String = row.try_get("id").map_err(map_sqlx_error)?;
    let body: String = row.try_get("body").map_err(map_sqlx_error)?;

    let id = DocumentId::parse(&id)?;
    let fields = serde_json::from_str::<Map<String, Value>>(&body).map_err(|e| {
        DbError::DataIntegrityError(format!("Invalid stored body for document {}: {}", id, e))
    })?;
    Ok(Document::new(fields).with_id(id))
}

/// Serializes the fields of a document for storage.
fn encode_body(fields: &Map<String, Value>) -> DbResult<String> {
    serde_json::to_string(fields).map_err(|e| DbError::DataIntegrityError(e.to_string()))
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn find(&self, filter: &Filter) -> DbResult<Vec<Document>> {
        let rows = match filter.id() {
            Some(id) => {
                sqlx::query("SELECT id, body FROM documents WHERE collection = ? AND id = ?")
                    .bind(&self.collection)
                    .bind(id.to_string())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT id, body FROM documents WHERE collection = ? ORDER BY seq")
                    .bind(&self.collection)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(map_sqlx_error)?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let doc = row_to_document(&row)?;
            if filter.matches(&doc) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    async fn find_one(&self, id: DocumentId) -> DbResult<Option<Document>> {
        let row = sqlx::query("SELECT id, body FROM documents WHERE collection = ? AND id = ?")
            .bind(&self.collection)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        match row {
            Some(row) => Ok(Some(row_to_document(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, doc: Document) -> DbResult<DocumentId> {
        let (id, fields) = doc.into_parts();
        let id = id.unwrap_or_else(DocumentId::generate);

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
            .bind(&self.collection)
            .bind(id.to_string())
            .bind(encode_body(&fields)?)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(id)
    }

    async fn remove(&self, filter: &Filter) -> DbResult<u64> {
        let victims = self.find(filter).await?;

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut count = 0;
        for id in victims.iter().filter_map(Document::id) {
            let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                .bind(&self.collection)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            count += result.rows_affected();
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(count)
    }

    async fn save(&self, doc: Document) -> DbResult<()> {
        let (id, fields) = doc.into_parts();
        let id = match id {
            Some(id) => id,
            None => {
                return Err(DbError::DataIntegrityError(
                    "Cannot save a document without an identifier".to_owned(),
                ));
            }
        };

        sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)
                ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body",
        )
        .bind(&self.collection)
        .bind(id.to_string())
        .bind(encode_body(&fields)?)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// Test utilities for the SQLite backend.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    use super::*;

    /// Initializes an empty in-memory test database.
    pub async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        SqliteDb::connect(":memory:").await.unwrap()
    }
}
