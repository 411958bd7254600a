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

//! View that indexes the resources of a service.

use crate::filter::QueryFilter;
use crate::form::Form;
use crate::resource::Resource;
use crate::rest::RestResult;
use crate::serializer::Serializer;
use crate::view::{BindView, Request, Response, View};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// View that answers `GET` with an object mapping resource names to their URIs.
pub struct Root {
    /// Precomputed response body.
    index: Map<String, Value>,
}

impl Root {
    /// Collects the name and URI of each of the `resources` to build the arguments of the view.
    pub fn index<'a, I: IntoIterator<Item = &'a Resource>>(resources: I) -> Vec<(String, String)> {
        resources.into_iter().map(|r| (r.name().to_owned(), r.uri().to_owned())).collect()
    }
}

#[async_trait]
impl View for Root {
    async fn get_list(&self, _request: Request) -> RestResult<Response> {
        Ok(Response::ok(Value::Object(self.index.clone())))
    }
}

impl BindView for Root {
    type Args = Vec<(String, String)>;

    fn bind(
        _form: Arc<dyn Form>,
        _serializer: Arc<dyn Serializer>,
        _filter: Arc<dyn QueryFilter>,
        entries: Self::Args,
    ) -> Self {
        let index = entries.into_iter().map(|(name, uri)| (name, Value::String(uri))).collect();
        Self { index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::RestError;
    use serde_json::json;

    #[tokio::test]
    async fn test_index() {
        let resources = [
            Resource::builder("users").build::<Root>(vec![]),
            Resource::builder("tokens").with_uri("/auth/tokens").build::<Root>(vec![]),
        ];
        let root = Resource::builder("root").with_uri("/").build::<Root>(Root::index(&resources));

        let response = root.view().get_list(Request::default()).await.unwrap();
        assert_eq!(
            &json!({"users": "/users/", "tokens": "/auth/tokens/"}),
            response.body().unwrap()
        );
    }

    #[tokio::test]
    async fn test_read_only() {
        let root = Resource::builder("root").build::<Root>(vec![]);
        assert_eq!(
            RestError::MethodNotAllowed,
            root.view().post(Request::default()).await.unwrap_err()
        );
    }
}
