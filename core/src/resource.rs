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

//! Addressable units of a service.
//!
//! A `Resource` ties a name and a URI to exactly one `View`, which is instantiated once when the
//! resource is built and shared by all requests afterwards.  Resources do no routing on their own:
//! see `rest::add_resource` to mount them on a router.

use crate::filter::{ExactFilter, QueryFilter};
use crate::form::{AnyForm, Form};
use crate::rest::Guard;
use crate::serializer::{PlainSerializer, Serializer};
use crate::view::{BindView, View};
use http::Method;
use std::sync::Arc;

/// A named endpoint served by a view.
pub struct Resource {
    /// Name of the resource.
    name: String,

    /// Base URI of the resource, with leading and trailing slashes.
    uri: String,

    /// The view that serves all requests sent to this resource.
    view: Arc<dyn View>,

    /// Authenticator for the requests sent to this resource, if any.
    guard: Option<Arc<dyn Guard>>,

    /// Methods that skip the guard.
    public: Vec<Method>,
}

impl Resource {
    /// Starts building a resource called `name`.
    pub fn builder<N: Into<String>>(name: N) -> ResourceBuilder {
        ResourceBuilder {
            name: name.into(),
            uri: None,
            form: Arc::new(AnyForm),
            serializer: Arc::new(PlainSerializer),
            filter: Arc::new(ExactFilter),
            guard: None,
            public: vec![],
        }
    }

    /// Returns the name of the resource.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the base URI of the resource.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the view of the resource.
    pub fn view(&self) -> &dyn View {
        self.view.as_ref()
    }

    /// Returns the authenticator of the resource, if any.
    pub fn guard(&self) -> Option<&dyn Guard> {
        self.guard.as_deref()
    }

    /// Checks whether requests with `method` must be authenticated.
    pub fn requires_auth(&self, method: &Method) -> bool {
        self.guard.is_some() && !self.public.contains(method)
    }
}

/// Builder for a `Resource`.
#[must_use]
pub struct ResourceBuilder {
    /// Name of the resource.
    name: String,

    /// Base URI of the resource, or `None` to derive it from the name.
    uri: Option<String>,

    /// Form to bind to the view.
    form: Arc<dyn Form>,

    /// Serializer to bind to the view.
    serializer: Arc<dyn Serializer>,

    /// Query filter to bind to the view.
    filter: Arc<dyn QueryFilter>,

    /// Authenticator for the requests sent to the resource.
    guard: Option<Arc<dyn Guard>>,

    /// Methods that skip the guard.
    public: Vec<Method>,
}

impl ResourceBuilder {
    /// Overrides the base URI of the resource, which defaults to `/<name>/`.
    pub fn with_uri<U: Into<String>>(mut self, uri: U) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Sets the form that validates the data written through the resource.
    pub fn with_form<F: Form + 'static>(mut self, form: F) -> Self {
        self.form = Arc::new(form);
        self
    }

    /// Sets the serializer that converts documents to and from the wire.
    pub fn with_serializer<S: Serializer + 'static>(mut self, serializer: S) -> Self {
        self.serializer = Arc::new(serializer);
        self
    }

    /// Sets the translator of list queries into storage filters.
    pub fn with_filter<F: QueryFilter + 'static>(mut self, filter: F) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Requires all requests to be authenticated by `guard`.
    pub fn with_guard<G: Guard + 'static>(mut self, guard: G) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Lets requests with `method` skip the guard.
    pub fn with_public(mut self, method: Method) -> Self {
        self.public.push(method);
        self
    }

    /// Finishes building the resource by instantiating its view of type `V` with `args`.
    pub fn build<V: BindView>(self, args: V::Args) -> Resource {
        let uri = normalize_uri(self.uri.unwrap_or_else(|| self.name.clone()));
        let view = V::bind(self.form, self.serializer, self.filter, args);
        Resource {
            name: self.name,
            uri,
            view: Arc::new(view),
            guard: self.guard,
            public: self.public,
        }
    }
}

/// Ensures that `uri` starts and ends with a slash.
fn normalize_uri(uri: String) -> String {
    let trimmed = uri.trim_matches('/');
    if trimmed.is_empty() { "/".to_owned() } else { format!("/{}/", trimmed) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Filter;
    use crate::form::FormErrors;
    use crate::model::{DocumentId, Identity};
    use crate::rest::{RestError, RestResult};
    use crate::view::{Request, Response};
    use async_trait::async_trait;
    use axum::http::HeaderMap;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

    /// View that reports how it was bound.
    struct EchoView {
        /// Form the view was bound to.
        form: Arc<dyn Form>,

        /// Serializer the view was bound to.
        serializer: Arc<dyn Serializer>,

        /// Query filter the view was bound to.
        filter: Arc<dyn QueryFilter>,

        /// Argument the view was bound to.
        arg: i32,
    }

    #[async_trait]
    impl View for EchoView {
        async fn post(&self, request: Request) -> RestResult<Response> {
            let fields = self.form.validate(request.into_data())?;
            Ok(Response::ok(json!({
                "fields": Value::Object(fields),
                "id": self.serializer.encode_id(DocumentId::from_bytes([0; 12])),
                "arg": self.arg,
            })))
        }

        async fn get_list(&self, request: Request) -> RestResult<Response> {
            let filter = self.filter.to_filter(request.query(), self.serializer.as_ref())?;
            Ok(Response::ok(json!({"id": filter.id().map(|id| id.to_string())})))
        }
    }

    impl BindView for EchoView {
        type Args = i32;

        fn bind(
            form: Arc<dyn Form>,
            serializer: Arc<dyn Serializer>,
            filter: Arc<dyn QueryFilter>,
            arg: i32,
        ) -> Self {
            Self { form, serializer, filter, arg }
        }
    }

    /// Form that rejects everything.
    struct RejectForm;

    impl Form for RejectForm {
        fn validate(&self, _data: Value) -> Result<serde_json::Map<String, Value>, FormErrors> {
            Err(FormErrors::Global("Rejected".to_owned()))
        }
    }

    /// Filter that rejects every query.
    struct RejectFilter;

    impl QueryFilter for RejectFilter {
        fn to_filter(
            &self,
            _query: &BTreeMap<String, String>,
            _serializer: &dyn Serializer,
        ) -> RestResult<Filter> {
            Err(RestError::InvalidRequest("No filters".to_owned()))
        }
    }

    /// Guard that accepts everyone.
    struct OpenGuard;

    #[async_trait]
    impl Guard for OpenGuard {
        async fn authenticate(&self, _headers: &HeaderMap) -> RestResult<Identity> {
            Ok(Identity::new("anyone"))
        }
    }

    #[tokio::test]
    async fn test_defaults() {
        let resource = Resource::builder("things").build::<EchoView>(42);
        assert_eq!("things", resource.name());
        assert_eq!("/things/", resource.uri());
        assert!(resource.guard().is_none());
        assert!(!resource.requires_auth(&Method::GET));

        let response = resource.view().post(Request::new(json!({"a": 1}))).await.unwrap();
        assert_eq!(
            &json!({"fields": {"a": 1}, "id": "000000000000000000000000", "arg": 42}),
            response.body().unwrap()
        );
    }

    #[tokio::test]
    async fn test_custom_form() {
        let resource = Resource::builder("things").with_form(RejectForm).build::<EchoView>(0);
        assert_eq!(
            RestError::Validation(FormErrors::Global("Rejected".to_owned())),
            resource.view().post(Request::new(json!({}))).await.unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_default_filter() {
        let resource = Resource::builder("things").build::<EchoView>(0);
        let id = DocumentId::generate();
        let mut query = BTreeMap::default();
        query.insert("_id".to_owned(), id.to_string());
        let response = resource.view().get_list(Request::default().with_query(query)).await.unwrap();
        assert_eq!(&json!({"id": id.to_string()}), response.body().unwrap());
    }

    #[tokio::test]
    async fn test_custom_filter() {
        let resource = Resource::builder("things").with_filter(RejectFilter).build::<EchoView>(0);
        assert_eq!(
            RestError::InvalidRequest("No filters".to_owned()),
            resource.view().get_list(Request::default()).await.unwrap_err()
        );
    }

    #[test]
    fn test_uri() {
        for (uri, exp_uri) in [("/a/b/", "/a/b/"), ("a/b", "/a/b/"), ("/", "/"), ("", "/")] {
            let resource = Resource::builder("x").with_uri(uri).build::<EchoView>(0);
            assert_eq!(exp_uri, resource.uri());
        }
    }

    #[test]
    fn test_guard_and_public_methods() {
        let resource = Resource::builder("users")
            .with_guard(OpenGuard)
            .with_public(Method::POST)
            .build::<EchoView>(0);
        assert!(resource.guard().is_some());
        assert!(resource.requires_auth(&Method::GET));
        assert!(resource.requires_auth(&Method::DELETE));
        assert!(!resource.requires_auth(&Method::POST));
    }
}
