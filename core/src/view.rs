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

//! The verb-dispatch contract of resources.
//!
//! A `View` receives requests that have already been routed and authenticated and implements one
//! operation per HTTP verb.  List operations act on the whole resource and item operations act on
//! the document named by the identifier in the path.  Views that do not support a verb keep the
//! default implementation, which rejects the request with `405 Method Not Allowed`.

use crate::filter::QueryFilter;
use crate::form::Form;
use crate::model::Identity;
use crate::rest::{RestError, RestResult};
use crate::serializer::Serializer;
use async_trait::async_trait;
use axum::Json;
use axum::response::IntoResponse;
use http::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

mod collection;
pub use collection::Collection;
mod root;
pub use root::Root;

/// A decoded request as seen by a view.
#[derive(Debug, Default)]
pub struct Request {
    /// Parsed JSON body of the request, or `Null` if the request had no body.
    data: Value,

    /// Query string parameters.
    query: BTreeMap<String, String>,

    /// Identity of the authenticated caller, if the resource required authentication.
    identity: Option<Identity>,
}

impl Request {
    /// Creates a new request carrying `data` as its body.
    pub fn new(data: Value) -> Self {
        Self { data, ..Default::default() }
    }

    /// Sets the query parameters of the request.
    pub fn with_query(mut self, query: BTreeMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Sets the identity of the caller.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Returns the body of the request.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Consumes the request and returns its body.
    pub fn into_data(self) -> Value {
        self.data
    }

    /// Returns the query parameters of the request.
    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Returns the identity of the caller, if known.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

/// A response produced by a view.
#[derive(Debug, PartialEq)]
pub struct Response {
    /// HTTP status of the response.
    status: StatusCode,

    /// JSON body of the response, if any.
    body: Option<Value>,
}

impl Response {
    /// Creates a `200 OK` response with `body`.
    pub fn ok(body: Value) -> Self {
        Self { status: StatusCode::OK, body: Some(body) }
    }

    /// Creates a `201 Created` response with `body`.
    pub fn created(body: Value) -> Self {
        Self { status: StatusCode::CREATED, body: Some(body) }
    }

    /// Creates a `204 No Content` response.
    pub fn no_content() -> Self {
        Self { status: StatusCode::NO_CONTENT, body: None }
    }

    /// Returns the status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the body of the response.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

/// Operations that a resource can serve, one per verb and target.
///
/// Item operations receive the identifier exactly as it appeared in the request path.
#[async_trait]
pub trait View: Send + Sync {
    /// Handles `GET` on the resource.
    async fn get_list(&self, _request: Request) -> RestResult<Response> {
        Err(RestError::MethodNotAllowed)
    }

    /// Handles `GET` on the item `_id`.
    async fn get_item(&self, _request: Request, _id: &str) -> RestResult<Response> {
        Err(RestError::MethodNotAllowed)
    }

    /// Handles `POST` on the resource.
    async fn post(&self, _request: Request) -> RestResult<Response> {
        Err(RestError::MethodNotAllowed)
    }

    /// Handles `PUT` on the item `_id`.
    async fn put(&self, _request: Request, _id: &str) -> RestResult<Response> {
        Err(RestError::MethodNotAllowed)
    }

    /// Handles `PATCH` on the item `_id`.
    async fn patch(&self, _request: Request, _id: &str) -> RestResult<Response> {
        Err(RestError::MethodNotAllowed)
    }

    /// Handles `DELETE` on the resource.
    async fn delete_list(&self, _request: Request) -> RestResult<Response> {
        Err(RestError::MethodNotAllowed)
    }

    /// Handles `DELETE` on the item `_id`.
    async fn delete_item(&self, _request: Request, _id: &str) -> RestResult<Response> {
        Err(RestError::MethodNotAllowed)
    }
}

/// Views that can be instantiated by a `Resource`.
///
/// The resource hands over its form, serializer and query filter, plus any view-specific `Args`
/// such as the storage handle the view operates on.  Views ignore the pieces they have no use
/// for.
pub trait BindView: View + Sized + 'static {
    /// View-specific construction arguments.
    type Args;

    /// Creates a new view bound to `form`, `serializer`, `filter` and `args`.
    fn bind(
        form: Arc<dyn Form>,
        serializer: Arc<dyn Serializer>,
        filter: Arc<dyn QueryFilter>,
        args: Self::Args,
    ) -> Self;
}
