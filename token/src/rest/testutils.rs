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

//! Utilities to help testing services that integrate with token authentication.

use crate::rest::{LoginRequest, LoginResponse};
use axum::Router;
use http::{Method, StatusCode};
use rsrc_core::rest::testutils::OneShotBuilder;
use serde_json::Value;

#[cfg(test)]
use {
    crate::driver::TokenOptions,
    crate::driver::testutils::TestContext as DriverContext,
    crate::rest::{TokenGuard, tokens_resource},
    rsrc_core::db::DocumentStore,
    rsrc_core::model::DocumentId,
    rsrc_core::resource::Resource,
    rsrc_core::rest::add_resource,
    rsrc_core::view::Collection,
    std::sync::Arc,
};

/// Logs the `username` in with `password` and returns the response of the server.
///
/// The `app` must serve the `tokens` resource at `/tokens/`.
pub async fn do_test_login(app: Router, username: &str, password: &str) -> LoginResponse {
    let request = LoginRequest {
        username: Some(username.to_owned()),
        password: Some(password.to_owned()),
        expires: None,
    };
    OneShotBuilder::new(app, (Method::POST, "/tokens/"))
        .send_json(request)
        .await
        .expect_status(StatusCode::CREATED)
        .expect_json::<LoginResponse>()
        .await
}

/// Returns the textual form of the user identifier `id` returned by a login.
pub fn id_str(id: &Value) -> &str {
    id.as_str().expect("User identifiers must be strings")
}

/// State of a running test.
#[cfg(test)]
pub(crate) struct TestContext {
    /// The app serving a protected `users` collection and the `tokens` resource.
    app: Router,

    /// The underlying driver context.
    context: DriverContext,
}

#[cfg(test)]
impl TestContext {
    /// Initializes the app on top of an in-memory SQLite database.
    pub(crate) async fn setup() -> Self {
        let db = rsrc_core::db::sqlite::testutils::setup().await;
        let users: Arc<dyn DocumentStore> = Arc::new(db.collection("users"));
        let secrets: Arc<dyn DocumentStore> = Arc::new(db.collection("secrets"));
        let context =
            DriverContext::setup_with(TokenOptions::new("test-secret-key"), users.clone(), secrets);

        let users_resource = Resource::builder("users")
            .with_guard(TokenGuard::new(context.driver()))
            .with_public(Method::POST)
            .build::<Collection>(users);
        let app = add_resource(Router::new(), users_resource);
        let app = add_resource(app, tokens_resource(context.driver()));

        Self { app, context }
    }

    /// Syntactic sugar to create a user with a hashed `password`.
    pub(crate) async fn create_user(&self, username: &str, password: &str) -> DocumentId {
        self.context.create_user(username, password).await
    }

    /// Gets a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }
}
