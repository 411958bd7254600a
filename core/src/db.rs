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

//! Generic abstraction to access different document stores.
//!
//! The facilities in this module provide an abstraction over different storage systems.  The
//! SQLite backend is for production use and the in-memory backend is primarily intended to support
//! unit tests and throwaway services.
//!
//! Backends only guarantee single-document atomicity: there are no multi-document transactions,
//! and concurrent writers to the same document follow last-write-wins semantics.

use crate::model::{Document, DocumentId, ModelError};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub mod memory;
#[cfg(any(test, feature = "sqlite"))]
pub mod sqlite;

/// Database errors.  Any unexpected errors that come from the database are classified as
/// `BackendError`, but errors we know about have more specific types.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// Indicates that a request to create an entry failed because it already exists.
    #[error("Already exists")]
    AlreadyExists,

    /// Catch-all error type for unexpected database errors.
    #[error("Database error: {0}")]
    BackendError(String),

    /// Indicates a failure processing the data that already exists in the database.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Selection criteria for documents.
///
/// A filter matches a document when the document has the requested identifier (if any) and all
/// the listed top-level fields hold exactly the given native values.  The empty filter matches all
/// documents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    /// Identifier the document must have.
    id: Option<DocumentId>,

    /// Fields and the values they must hold.
    fields: Map<String, Value>,
}

impl Filter {
    /// Creates a filter that requires the identifier `id`, if any, and all the `fields`.
    pub fn new(id: Option<DocumentId>, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    /// Creates a filter that matches all documents.
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a filter that matches the document with identifier `id`.
    pub fn by_id(id: DocumentId) -> Self {
        Self { id: Some(id), fields: Map::default() }
    }

    /// Creates a filter that matches the documents holding all the `fields`.
    pub fn by_fields(fields: Map<String, Value>) -> Self {
        Self { id: None, fields }
    }

    /// Adds a requirement for the field `name` to hold `value`.
    pub fn with_field<N: Into<String>>(mut self, name: N, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Returns the identifier this filter requires, if any.
    pub fn id(&self) -> Option<DocumentId> {
        self.id
    }

    /// Checks if the `doc` satisfies this filter.
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(id) = self.id {
            if doc.id() != Some(id) {
                return false;
            }
        }
        self.fields.iter().all(|(name, value)| doc.get(name) == Some(value))
    }
}

/// Abstraction over one collection of documents.
///
/// Every operation is a suspension point and may fail with a backend error, which callers are
/// expected to propagate untouched.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns all documents that match `filter` in insertion order.
    async fn find(&self, filter: &Filter) -> DbResult<Vec<Document>>;

    /// Returns the document with identifier `id`, if any.
    async fn find_one(&self, id: DocumentId) -> DbResult<Option<Document>>;

    /// Inserts a new `doc` and returns its identifier.
    ///
    /// If the document does not carry an identifier, a new one is generated.  Inserting a
    /// document whose identifier is already in use fails with `AlreadyExists`.
    async fn insert(&self, doc: Document) -> DbResult<DocumentId>;

    /// Removes all documents that match `filter` and returns how many were removed.
    async fn remove(&self, filter: &Filter) -> DbResult<u64>;

    /// Inserts `doc` or replaces the document that has the same identifier.
    ///
    /// The document must carry an identifier.
    async fn save(&self, doc: Document) -> DbResult<()>;
}

/// Macros to help instantiate tests for multiple document stores.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    pub use paste::paste;

    /// Instantiates the `module::name` test for the store configured by `setup`.
    ///
    /// The `extra` metadata parameter can be used to tag the generated tests.
    #[macro_export]
    macro_rules! generate_one_test [
        ( $name:ident, $setup:expr, $module:path $(, #[$extra:meta] )? ) => {
            #[tokio::test]
            $(#[$extra])?
            async fn $name() {
                $crate::db::testutils::paste! {
                    $module :: [< $name >]($setup).await;
                }
            }
        }
    ];

    pub use generate_one_test;

    /// Instantiates a collection of tests for a specific document store.
    ///
    /// The store implementation to run the tests against is determined by the `setup` expression,
    /// which needs to return an empty store boxed as a `dyn DocumentStore`.
    ///
    /// The `extra` metadata parameter can be used to tag the generated tests.
    #[macro_export]
    macro_rules! generate_tests [
        ( #[$extra:meta], $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module, #[$extra]);
            )+
        };

        ( $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module);
            )+
        };
    ];

    pub use generate_tests;
}
