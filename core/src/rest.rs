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

//! Generic code for REST handlers.
//!
//! Services assemble their `Router` by mounting one or more `Resource`s with `add_resource`.
//! Every resource gets a list route (`<uri>`) and an item route (`<uri>/<id>/`), and all verbs
//! sent to them are dispatched to the resource's `View`.
//!
//! Errors returned by views and guards are `RestError`s, which render as a JSON `ErrorResponse`
//! with the matching HTTP status code.

use crate::db::DbError;
use crate::driver::DriverError;
use crate::form::FormErrors;
use crate::model::{Identity, ModelError};
use async_trait::async_trait;
use axum::Json;
use axum::http::header::AsHeaderName;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

mod mount;
pub use mount::{add_resource, add_root};

/// `WWW-Authenticate` challenge sent to callers that fail to authenticate.
pub const AUTH_CHALLENGE: &str = "Bearer realm=\"rsrc\"";

/// Frontend errors.  These are the errors that are visible to the user on failed requests.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// Catch-all error type for all unexpected errors.
    #[error("{0}")]
    InternalError(String),

    /// Indicates an error in the contents of the request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Indicates that the resource does not support the requested method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Indicates that a requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that a JSON Patch could not be parsed or applied.
    #[error("Cannot apply patch: {0}")]
    PatchFailed(String),

    /// Indicates an authentication problem.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Indicates that the request data did not pass validation.
    #[error("Invalid data: {0}")]
    Validation(FormErrors),
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::AlreadyExists(_) => RestError::InvalidRequest(e.to_string()),
            DriverError::BackendError(_) => RestError::InternalError(e.to_string()),
            DriverError::NotFound(_) => RestError::NotFound(e.to_string()),
            DriverError::Unauthorized(_) => RestError::Unauthorized(e.to_string()),
        }
    }
}

impl From<DbError> for RestError {
    fn from(e: DbError) -> Self {
        RestError::from(DriverError::from(e))
    }
}

impl From<FormErrors> for RestError {
    fn from(e: FormErrors) -> Self {
        RestError::Validation(e)
    }
}

impl From<ModelError> for RestError {
    fn from(e: ModelError) -> Self {
        RestError::InvalidRequest(e.to_string())
    }
}

impl From<serde_json::Error> for RestError {
    fn from(e: serde_json::Error) -> Self {
        RestError::InvalidRequest(e.to_string())
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> axum::response::Response {
        let status;
        let mut headers = HeaderMap::new();
        let mut response = ErrorResponse { message: self.to_string(), ..Default::default() };
        match self {
            RestError::InternalError(e) => {
                log::error!("Request failed with internal error: {}", e);
                status = http::StatusCode::INTERNAL_SERVER_ERROR;
            }
            RestError::InvalidRequest(_) => {
                status = http::StatusCode::BAD_REQUEST;
            }
            RestError::MethodNotAllowed => {
                status = http::StatusCode::METHOD_NOT_ALLOWED;
            }
            RestError::NotFound(_) => {
                status = http::StatusCode::NOT_FOUND;
            }
            RestError::PatchFailed(e) => {
                status = http::StatusCode::BAD_REQUEST;
                response.jsonpatch_error = Some(e);
            }
            RestError::Unauthorized(_) => {
                status = http::StatusCode::UNAUTHORIZED;
                headers.insert(
                    http::header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(AUTH_CHALLENGE),
                );
            }
            RestError::Validation(errors) => {
                status = http::StatusCode::BAD_REQUEST;
                response.errors = Some(errors);
            }
        };

        (status, headers, Json(response)).into_response()
    }
}

/// Result type for this module.
pub type RestResult<T> = Result<T, RestError>;

/// Representation of the details of an error response.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// Textual representation of the error message.
    pub message: String,

    /// Validation errors, if the request data was rejected by a form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FormErrors>,

    /// Details of a patch operation that could not be applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonpatch_error: Option<String>,
}

/// Authenticator of the requests sent to a resource.
#[async_trait]
pub trait Guard: Send + Sync {
    /// Resolves the credentials in the request `headers` to an identity.
    ///
    /// Requests that cannot be authenticated must be rejected with `RestError::Unauthorized`.
    async fn authenticate(&self, headers: &HeaderMap) -> RestResult<Identity>;
}

/// Extracts the header `name` from `headers` and ensures it has at most one value.
pub fn get_unique_header<K: AsHeaderName + Copy>(
    headers: &HeaderMap,
    name: K,
) -> RestResult<Option<&HeaderValue>> {
    let mut iter = headers.get_all(name).iter();
    let value = iter.next();
    if iter.next().is_some() {
        return Err(RestError::InvalidRequest(format!(
            "Header {} cannot have more than one value",
            name.as_str()
        )));
    }
    Ok(value)
}

/// Common test code for the REST server.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    use super::*;
    use axum::Router;
    use axum::extract::Request;
    use axum::http::{self, HeaderName};
    use base64::Engine;
    use base64::engine::general_purpose;
    use serde::de::DeserializeOwned;
    use std::fmt;
    use tower::util::ServiceExt;

    /// Maximum body size for testing purposes.
    const MAX_BODY_SIZE: usize = 64 * 1024;

    /// Builder for a single request to the API server.
    #[must_use]
    pub struct OneShotBuilder {
        /// The router for the app being tested.
        app: Router,

        /// Builder for the request that will be sent to the app.
        builder: axum::http::request::Builder,
    }

    impl OneShotBuilder {
        /// Creates a new request against a given `method`/`uri` pair served by an `app` router.
        pub fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
            let builder = Request::builder().method(method).uri(uri.as_ref());
            Self { app, builder }
        }

        /// Extends the URI in the request with a `query`.
        pub fn with_query<Q: Serialize>(mut self, query: Q) -> Self {
            let uri = self.builder.uri_ref().unwrap().to_string();
            assert!(!uri.contains('?'), "URI already contains a query: {}", uri);
            self.builder = self.builder.uri(format!(
                "{}?{}",
                uri,
                serde_urlencoded::to_string(query).unwrap()
            ));
            self
        }

        /// Adds basic authentication to the request.
        pub fn with_basic_auth<U, P>(mut self, username: U, password: P) -> Self
        where
            U: fmt::Display,
            P: fmt::Display,
        {
            let value = format!(
                "Basic {}",
                general_purpose::STANDARD.encode(format!("{}:{}", username, password))
            );
            self.builder = self.builder.header(http::header::AUTHORIZATION, value);
            self
        }

        /// Adds bearer authentication to the request.
        pub fn with_bearer_auth<T>(mut self, token: T) -> Self
        where
            T: fmt::Display,
        {
            let value = format!("Bearer {}", token);
            self.builder = self.builder.header(http::header::AUTHORIZATION, value);
            self
        }

        /// Sets the header `name` to `value` in the outgoing request.
        pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
        where
            HeaderName: TryFrom<K>,
            <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
            HeaderValue: TryFrom<V>,
            <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
        {
            self.builder = self.builder.header(name, value);
            self
        }

        /// Finishes building the request and sends it with an empty payload.
        pub async fn send_empty(self) -> ResponseChecker {
            let request = self.builder.body(axum::body::Body::empty()).unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a text payload.
        pub async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::TEXT_PLAIN.as_ref())
                .body(axum::body::Body::from(text.into()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a JSON payload.
        pub async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(axum::body::Body::from(serde_json::to_vec(&request).unwrap()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }
    }

    /// Type alias for the complex type returned by the `oneshot` function.
    type HttpResponse = axum::response::Response;

    /// Validator for the outcome of a request sent by a `OneShotBuilder`.
    #[must_use]
    pub struct ResponseChecker {
        /// Actual response that we received from the app.
        response: HttpResponse,

        /// Expected HTTP status code in the response above.
        exp_status: http::StatusCode,
    }

    impl From<HttpResponse> for ResponseChecker {
        fn from(response: HttpResponse) -> Self {
            Self { response, exp_status: http::StatusCode::OK }
        }
    }

    impl ResponseChecker {
        /// Sets the expected exit HTTP status to `status`.
        pub fn expect_status(mut self, status: http::StatusCode) -> Self {
            self.exp_status = status;
            self
        }

        /// Performs common validation operations on the response.
        pub fn verify(&self) {
            assert_eq!(self.exp_status, self.response.status());
        }

        /// Finishes checking the response and expects it to contain an empty body.
        pub async fn expect_empty(self) {
            self.verify();

            let body =
                axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
            let body = String::from_utf8(body.to_vec()).unwrap();
            assert!(body.is_empty(), "Body not empty; got {}", body);
        }

        /// Finishes checking the response and expects its body to be an `ErrorResponse` whose
        /// message matches `exp_re`.  Returns the parsed response for further validation.
        pub async fn expect_error(self, exp_re: &str) -> ErrorResponse {
            self.verify();

            let body =
                axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
            let response: ErrorResponse = match serde_json::from_slice(&body) {
                Ok(response) => response,
                Err(e) => {
                    let body = String::from_utf8(body.to_vec()).unwrap();
                    panic!("Invalid error response due to {}; content was {}", e, body);
                }
            };
            let re = regex::Regex::new(exp_re).unwrap();
            assert!(
                re.is_match(&response.message),
                "Response content '{:?}' does not match re '{}'",
                response,
                exp_re
            );
            response
        }

        /// Finishes checking the response and expects it to contain a valid JSON object of
        /// type `T`.
        pub async fn expect_json<T: DeserializeOwned>(self) -> T {
            self.verify();

            let body =
                axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap();
            serde_json::from_slice::<T>(&body).unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Renders `e` and returns its status, its headers and its JSON body.
    async fn render(e: RestError) -> (http::StatusCode, HeaderMap, serde_json::Value) {
        let response = e.into_response();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        (status, headers, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_resterror_statuses() {
        for (e, exp_status) in [
            (RestError::InternalError("x".to_owned()), http::StatusCode::INTERNAL_SERVER_ERROR),
            (RestError::InvalidRequest("x".to_owned()), http::StatusCode::BAD_REQUEST),
            (RestError::MethodNotAllowed, http::StatusCode::METHOD_NOT_ALLOWED),
            (RestError::NotFound("x".to_owned()), http::StatusCode::NOT_FOUND),
        ] {
            let message = e.to_string();
            let (status, _headers, body) = render(e).await;
            assert_eq!(exp_status, status);
            assert_eq!(json!({"message": message}), body);
        }
    }

    #[tokio::test]
    async fn test_resterror_unauthorized_challenge() {
        let (status, headers, body) = render(RestError::Unauthorized("bad".to_owned())).await;
        assert_eq!(http::StatusCode::UNAUTHORIZED, status);
        assert_eq!(
            AUTH_CHALLENGE,
            headers.get(http::header::WWW_AUTHENTICATE).unwrap().to_str().unwrap()
        );
        assert_eq!(json!({"message": "Unauthorized: bad"}), body);
    }

    #[tokio::test]
    async fn test_resterror_validation_details() {
        let e = RestError::from(FormErrors::field("name", "Required"));
        let (status, _headers, body) = render(e).await;
        assert_eq!(http::StatusCode::BAD_REQUEST, status);
        assert_eq!(
            json!({"message": "Invalid data: name: Required", "errors": {"name": "Required"}}),
            body
        );
    }

    #[tokio::test]
    async fn test_resterror_patch_details() {
        let (status, _headers, body) = render(RestError::PatchFailed("bad op".to_owned())).await;
        assert_eq!(http::StatusCode::BAD_REQUEST, status);
        assert_eq!(
            json!({"message": "Cannot apply patch: bad op", "jsonpatch_error": "bad op"}),
            body
        );
    }

    #[test]
    fn test_resterror_from_lower_layers() {
        assert_eq!(
            RestError::InternalError("Database error: boom".to_owned()),
            RestError::from(DbError::BackendError("boom".to_owned()))
        );
        assert_eq!(
            RestError::NotFound("User x not found".to_owned()),
            RestError::from(DriverError::NotFound("User x not found".to_owned()))
        );
        assert_eq!(
            RestError::Unauthorized("Expired".to_owned()),
            RestError::from(DriverError::Unauthorized("Expired".to_owned()))
        );
        assert_eq!(
            RestError::InvalidRequest("Bad".to_owned()),
            RestError::from(ModelError("Bad".to_owned()))
        );
    }

    #[test]
    fn test_get_unique_header_missing() {
        let mut headers = HeaderMap::new();
        headers.append("ignore-me", "ignored".parse().unwrap());
        assert!(get_unique_header(&headers, "the-header").unwrap().is_none());
    }

    #[test]
    fn test_get_unique_header_one() {
        let mut headers = HeaderMap::new();
        headers.append("ignore-me", "ignored".parse().unwrap());
        headers.append("the-header", "foo".parse().unwrap());
        assert_eq!(b"foo", get_unique_header(&headers, "the-header").unwrap().unwrap().as_bytes());
    }

    #[test]
    fn test_get_unique_header_many() {
        let mut headers = HeaderMap::new();
        headers.append("the-header", "foo".parse().unwrap());
        headers.append("ignore-me", "ignored".parse().unwrap());
        headers.append("The-Header", "bar".parse().unwrap());
        assert_eq!(
            RestError::InvalidRequest(
                "Header the-header cannot have more than one value".to_owned()
            ),
            get_unique_header(&headers, "the-header").unwrap_err()
        );
    }
}
