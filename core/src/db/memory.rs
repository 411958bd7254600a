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

//! Document store backed by process memory.

use crate::db::{DbError, DbResult, DocumentStore, Filter};
use crate::model::{Document, DocumentId};
use async_trait::async_trait;
use futures::lock::Mutex;
use std::sync::Arc;

/// A collection of documents that lives in memory.
///
/// Cloning the store yields a new handle to the same set of documents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    /// Documents in insertion order.  All of them carry an identifier.
    docs: Arc<Mutex<Vec<Document>>>,
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, filter: &Filter) -> DbResult<Vec<Document>> {
        let docs = self.docs.lock().await;
        Ok(docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
    }

    async fn find_one(&self, id: DocumentId) -> DbResult<Option<Document>> {
        let docs = self.docs.lock().await;
        Ok(docs.iter().find(|doc| doc.id() == Some(id)).cloned())
    }

    async fn insert(&self, mut doc: Document) -> DbResult<DocumentId> {
        let mut docs = self.docs.lock().await;
        let id = match doc.id() {
            Some(id) => {
                if docs.iter().any(|other| other.id() == Some(id)) {
                    return Err(DbError::AlreadyExists);
                }
                id
            }
            None => {
                let id = DocumentId::generate();
                doc.set_id(Some(id));
                id
            }
        };
        docs.push(doc);
        Ok(id)
    }

    async fn remove(&self, filter: &Filter) -> DbResult<u64> {
        let mut docs = self.docs.lock().await;
        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }

    async fn save(&self, doc: Document) -> DbResult<()> {
        let id = match doc.id() {
            Some(id) => id,
            None => {
                return Err(DbError::DataIntegrityError(
                    "Cannot save a document without an identifier".to_owned(),
                ));
            }
        };

        let mut docs = self.docs.lock().await;
        match docs.iter_mut().find(|other| other.id() == Some(id)) {
            Some(slot) => *slot = doc,
            None => docs.push(doc),
        }
        Ok(())
    }
}
