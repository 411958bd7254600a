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

//! The view behind the `tokens` resource.

use crate::driver::TokenDriver;
use crate::model::{Password, Token};
use async_trait::async_trait;
use rsrc_core::filter::QueryFilter;
use rsrc_core::form::Form;
use rsrc_core::rest::{RestError, RestResult};
use rsrc_core::serializer::Serializer;
use rsrc_core::view::{BindView, Request, Response, View};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Message sent by the client to obtain a token.
///
/// Missing credentials are treated like wrong credentials.
#[derive(Default, Deserialize, Serialize)]
pub struct LoginRequest {
    /// Name of the user to log in.
    #[serde(default)]
    pub username: Option<String>,

    /// Password of the user to log in.
    #[serde(default)]
    pub password: Option<String>,

    /// Requested lifetime of the token in seconds, or `None` for the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
}

/// Message returned by the server after a login attempt.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct LoginResponse {
    /// The new token, or `None` if the credentials were rejected.
    pub token: Option<Token>,

    /// Lifetime of the token in seconds, or zero if the credentials were rejected.
    pub expires: u64,

    /// Identifier of the user, or `None` if the credentials were rejected.
    pub id: Option<Value>,
}

impl LoginResponse {
    /// Creates the response to a login attempt with bad credentials.
    fn rejected() -> Self {
        Self { token: None, expires: 0, id: None }
    }
}

/// View that issues tokens on `POST` and revokes them on item `DELETE`.
pub struct TokenView {
    /// Serializer for the user identifiers.
    serializer: Arc<dyn Serializer>,

    /// Driver that implements the token operations.
    driver: TokenDriver,
}

impl TokenView {
    /// Validates the credentials in `request` and issues a token if they are correct.
    async fn login(&self, request: LoginRequest) -> RestResult<LoginResponse> {
        let (username, password) = match (request.username, request.password) {
            (Some(username), Some(password)) => (username, password),
            _ => return Ok(LoginResponse::rejected()),
        };
        let password = match Password::new(password) {
            Ok(password) => password,
            Err(_) => return Ok(LoginResponse::rejected()),
        };

        let ttl = request.expires.map(Duration::from_secs);
        let outcome = self.driver.login(&username, password, ttl).await?;
        Ok(LoginResponse {
            token: outcome.token().clone(),
            expires: outcome.expires().as_secs(),
            id: outcome.id().map(|id| self.serializer.encode_id(id)),
        })
    }
}

#[async_trait]
impl View for TokenView {
    async fn post(&self, request: Request) -> RestResult<Response> {
        let request = serde_json::from_value::<LoginRequest>(request.into_data())?;
        let response = self.login(request).await?;
        Ok(Response::created(serde_json::to_value(response)?))
    }

    async fn delete_item(&self, request: Request, id: &str) -> RestResult<Response> {
        let identity = match request.identity() {
            Some(identity) => identity,
            None => return Err(RestError::Unauthorized("Missing credentials".to_owned())),
        };
        let target = self
            .serializer
            .decode_id(id)
            .map_err(|_| RestError::NotFound(format!("User {} not found", id)))?;

        self.driver.logout(identity, target).await?;
        Ok(Response::no_content())
    }
}

impl BindView for TokenView {
    type Args = TokenDriver;

    fn bind(
        _form: Arc<dyn Form>,
        serializer: Arc<dyn Serializer>,
        _filter: Arc<dyn QueryFilter>,
        driver: TokenDriver,
    ) -> Self {
        Self { serializer, driver }
    }
}
