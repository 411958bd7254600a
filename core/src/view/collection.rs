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

//! View that exposes a document store.

use crate::db::{DocumentStore, Filter};
use crate::filter::QueryFilter;
use crate::form::Form;
use crate::model::{Document, DocumentId};
use crate::rest::{RestError, RestResult};
use crate::serializer::{ID_FIELD, Serializer};
use crate::view::{BindView, Request, Response, View};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

/// View that maps every verb onto the documents of a `DocumentStore`.
///
/// `patch` loads, modifies, validates and saves the document in separate steps.  Concurrent
/// writers to the same document may interleave with these steps, in which case the last write
/// wins.
///
/// `put` replaces a document by removing it and inserting the new version.  If the insertion
/// fails, the old document stays removed.
pub struct Collection {
    /// Validator for the data written to the store.
    form: Arc<dyn Form>,

    /// Converter between stored documents and the wire.
    serializer: Arc<dyn Serializer>,

    /// Translator of list queries into storage filters.
    filter: Arc<dyn QueryFilter>,

    /// Backing store of the documents.
    store: Arc<dyn DocumentStore>,
}

impl BindView for Collection {
    type Args = Arc<dyn DocumentStore>;

    fn bind(
        form: Arc<dyn Form>,
        serializer: Arc<dyn Serializer>,
        filter: Arc<dyn QueryFilter>,
        store: Self::Args,
    ) -> Self {
        Self { form, serializer, filter, store }
    }
}

impl Collection {
    /// Parses the identifier `raw` of an item, treating unparseable values as missing items.
    fn item_id(&self, raw: &str) -> RestResult<DocumentId> {
        self.serializer
            .decode_id(raw)
            .map_err(|_| RestError::NotFound(format!("Document {} not found", raw)))
    }

    /// Validates the wire `data` and converts it into a document without identifier.
    fn validate(&self, data: Value) -> RestResult<Document> {
        let mut fields = self.form.validate(data)?;
        fields.shift_remove(ID_FIELD);
        let mut doc = self.serializer.decode(Value::Object(fields))?;
        doc.set_id(None);
        Ok(doc)
    }
}

#[async_trait]
impl View for Collection {
    async fn get_list(&self, request: Request) -> RestResult<Response> {
        let filter = self.filter.to_filter(request.query(), self.serializer.as_ref())?;
        let docs = self.store.find(&filter).await?;
        log::debug!("Listing {} documents", docs.len());
        Ok(Response::ok(Value::Array(docs.iter().map(|d| self.serializer.encode(d)).collect())))
    }

    async fn get_item(&self, _request: Request, raw_id: &str) -> RestResult<Response> {
        let id = self.item_id(raw_id)?;
        match self.store.find_one(id).await? {
            Some(doc) => Ok(Response::ok(self.serializer.encode(&doc))),
            None => Err(RestError::NotFound(format!("Document {} not found", raw_id))),
        }
    }

    async fn post(&self, request: Request) -> RestResult<Response> {
        let doc = self.validate(request.into_data())?;
        let id = self.store.insert(doc).await?;
        log::debug!("Created document {}", id);
        Ok(Response::created(json!({"id": self.serializer.encode_id(id)})))
    }

    async fn put(&self, request: Request, raw_id: &str) -> RestResult<Response> {
        let id = self.serializer.decode_id(raw_id)?;
        let doc = self.validate(request.into_data())?.with_id(id);

        let removed = self.store.remove(&Filter::by_id(id)).await?;
        self.store.insert(doc).await?;
        log::debug!("Replaced document {} (existed: {})", id, removed > 0);
        Ok(Response::no_content())
    }

    async fn patch(&self, request: Request, raw_id: &str) -> RestResult<Response> {
        let id = self.item_id(raw_id)?;
        let current = match self.store.find_one(id).await? {
            Some(doc) => doc,
            None => return Err(RestError::NotFound(format!("Document {} not found", raw_id))),
        };

        let mut object = self.serializer.encode(&current);
        if let Value::Object(fields) = &mut object {
            fields.shift_remove(ID_FIELD);
        }

        let operations = serde_json::from_value::<json_patch::Patch>(request.into_data())
            .map_err(|e| RestError::PatchFailed(e.to_string()))?;
        json_patch::patch(&mut object, &operations)
            .map_err(|e| RestError::PatchFailed(e.to_string()))?;

        let doc = self.validate(object)?.with_id(id);
        self.store.save(doc).await?;
        log::debug!("Patched document {} with {} operations", id, operations.0.len());
        Ok(Response::no_content())
    }

    async fn delete_list(&self, _request: Request) -> RestResult<Response> {
        let count = self.store.remove(&Filter::all()).await?;
        log::debug!("Deleted {} documents", count);
        Ok(Response::no_content())
    }

    async fn delete_item(&self, _request: Request, raw_id: &str) -> RestResult<Response> {
        let id = self.item_id(raw_id)?;
        match self.store.remove(&Filter::by_id(id)).await? {
            0 => Err(RestError::NotFound(format!("Document {} not found", raw_id))),
            _ => Ok(Response::no_content()),
        }
    }
}
