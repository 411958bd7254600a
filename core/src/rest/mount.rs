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

//! Routing of HTTP requests to resources.

use crate::resource::Resource;
use crate::rest::{RestError, RestResult};
use crate::view::{Request, Response};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method};
use axum::routing::any;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Mounts `resource` on `router`.
///
/// List verbs are served at the resource's URI and item verbs at `<uri><id>/`.
pub fn add_resource(router: Router, resource: Resource) -> Router {
    let list_uri = resource.uri().to_owned();
    let item_uri = format!("{}:id/", list_uri);
    log::debug!("Mounting resource {} at {}", resource.name(), list_uri);

    let resource_router = Router::new()
        .route(&list_uri, any(list_handler))
        .route(&item_uri, any(item_handler))
        .with_state(Arc::new(resource));
    router.merge(resource_router)
}

/// Mounts `root` on `router` at the root resource's URI.
///
/// Only the list route is served, so the root does not shadow the item routes of other resources.
pub fn add_root(router: Router, root: Resource) -> Router {
    let uri = root.uri().to_owned();
    log::debug!("Mounting root {} at {}", root.name(), uri);
    router.merge(Router::new().route(&uri, any(list_handler)).with_state(Arc::new(root)))
}

/// Authenticates the request if needed and assembles the `Request` to hand to the view.
async fn build_request(
    resource: &Resource,
    method: &Method,
    headers: &HeaderMap,
    query: BTreeMap<String, String>,
    body: &[u8],
) -> RestResult<Request> {
    let identity = match resource.guard() {
        Some(guard) if resource.requires_auth(method) => Some(guard.authenticate(headers).await?),
        _ => None,
    };

    let data = if body.is_empty() { Value::Null } else { serde_json::from_slice(body)? };

    let mut request = Request::new(data).with_query(query);
    if let Some(identity) = identity {
        request = request.with_identity(identity);
    }
    Ok(request)
}

/// Handler for all verbs sent to the list URI of a resource.
async fn list_handler(
    State(resource): State<Arc<Resource>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> RestResult<Response> {
    log::debug!("{} {}", method, resource.uri());
    if ![Method::GET, Method::POST, Method::DELETE].contains(&method) {
        return Err(RestError::MethodNotAllowed);
    }

    let request = build_request(&resource, &method, &headers, query, &body).await?;
    let view = resource.view();
    match method {
        Method::GET => view.get_list(request).await,
        Method::POST => view.post(request).await,
        _ => view.delete_list(request).await,
    }
}

/// Handler for all verbs sent to the item URIs of a resource.
async fn item_handler(
    State(resource): State<Arc<Resource>>,
    method: Method,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> RestResult<Response> {
    log::debug!("{} {}{}/", method, resource.uri(), id);
    if ![Method::GET, Method::PUT, Method::PATCH, Method::DELETE].contains(&method) {
        return Err(RestError::MethodNotAllowed);
    }

    let request = build_request(&resource, &method, &headers, query, &body).await?;
    let view = resource.view();
    match method {
        Method::GET => view.get_item(request, &id).await,
        Method::PUT => view.put(request, &id).await,
        Method::PATCH => view.patch(request, &id).await,
        _ => view.delete_item(request, &id).await,
    }
}
