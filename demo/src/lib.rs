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

//! Sample REST service that exposes a users collection protected by tokens.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use axum::Router;
use http::Method;
use rsrc_core::clocks::SystemClock;
use rsrc_core::db::DocumentStore;
use rsrc_core::db::sqlite::SqliteDb;
use rsrc_core::form::TypedForm;
use rsrc_core::resource::Resource;
use rsrc_core::rest::{add_resource, add_root};
use rsrc_core::serializer::ExtendedJsonSerializer;
use rsrc_core::view::{Collection, Root};
use rsrc_token::driver::{TokenDriver, TokenOptions};
use rsrc_token::rest::{TokenGuard, tokens_resource};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

mod filter;
use filter::UserFilter;
pub(crate) mod model;
use model::UserSchema;

/// Creates the router for the application on top of the collections of `db`.
///
/// Anyone can sign up by posting to `/users/`, but all other operations on users require a token
/// obtained from `/tokens/`.  `/` lists the available resources.
pub fn app(db: &SqliteDb, opts: TokenOptions) -> Router {
    let users: Arc<dyn DocumentStore> = Arc::new(db.collection("users"));
    let secrets: Arc<dyn DocumentStore> = Arc::new(db.collection("secrets"));
    let driver = TokenDriver::new(users.clone(), secrets, Arc::new(SystemClock::default()), opts);

    let users_resource = Resource::builder("users")
        .with_form(TypedForm::<UserSchema>::default())
        .with_serializer(ExtendedJsonSerializer)
        .with_filter(UserFilter)
        .with_guard(TokenGuard::new(driver.clone()))
        .with_public(Method::POST)
        .build::<Collection>(users);

    let resources = [users_resource, tokens_resource(driver)];
    let root = Resource::builder("root").with_uri("/").build::<Root>(Root::index(&resources));

    let mut app = Router::new();
    for resource in resources {
        app = add_resource(app, resource);
    }
    add_root(app, root)
}

/// Instantiates all resources to serve the application on `bind_addr`.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(
    bind_addr: impl Into<SocketAddr>,
    db_url: &str,
    opts: TokenOptions,
) -> Result<(), Box<dyn Error>> {
    let db = SqliteDb::connect(db_url).await?;
    let app = app(&db, opts);

    let listener = tokio::net::TcpListener::bind(bind_addr.into()).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use rsrc_core::rest::testutils::*;
    use rsrc_token::rest::testutils::{do_test_login, id_str};
    use serde_json::{Value, json};

    /// Creates the app on top of a fresh in-memory database.
    async fn setup() -> Router {
        let db = rsrc_core::db::sqlite::testutils::setup().await;
        app(&db, TokenOptions::new("test-secret-key"))
    }

    /// Signs up `username` with `password` and returns the new user identifier.
    async fn signup(app: Router, username: &str, password: &str) -> String {
        let response = OneShotBuilder::new(app, (Method::POST, "/users/"))
            .send_json(json!({
                "username": username,
                "password": password,
                "date_joined": "datetime(2014-10-25T00:00:00Z)",
            }))
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<Value>()
            .await;
        response["id"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_e2e_login_logout_flow() {
        let app = setup().await;
        let id = signup(app.clone(), "alice", "secret").await;

        let response = do_test_login(app.clone(), "alice", "secret").await;
        assert_eq!(3600, response.expires);
        assert_eq!(id, id_str(response.id.as_ref().unwrap()));
        let token = response.token.unwrap();

        let users = OneShotBuilder::new(app.clone(), (Method::GET, "/users/"))
            .with_basic_auth(token.as_str(), "")
            .send_empty()
            .await
            .expect_status(StatusCode::OK)
            .expect_json::<Vec<Value>>()
            .await;
        assert_eq!(1, users.len());
        assert_eq!(json!(id), users[0]["_id"]);
        assert_eq!(json!("datetime(2014-10-25T00:00:00Z)"), users[0]["date_joined"]);

        OneShotBuilder::new(app.clone(), (Method::DELETE, format!("/tokens/{}/", id)))
            .with_basic_auth(token.as_str(), "")
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(app, (Method::GET, "/users/"))
            .with_basic_auth(token.as_str(), "")
            .send_empty()
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_error("Unauthorized")
            .await;
    }

    #[tokio::test]
    async fn test_login_again_after_logout() {
        let app = setup().await;
        let id = signup(app.clone(), "alice", "secret").await;

        let token1 = do_test_login(app.clone(), "alice", "secret").await.token.unwrap();
        OneShotBuilder::new(app.clone(), (Method::DELETE, format!("/tokens/{}/", id)))
            .with_bearer_auth(token1.as_str())
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        let token2 = do_test_login(app.clone(), "alice", "secret").await.token.unwrap();
        OneShotBuilder::new(app, (Method::GET, format!("/users/{}/", id)))
            .with_bearer_auth(token2.as_str())
            .send_empty()
            .await
            .expect_status(StatusCode::OK)
            .expect_json::<Value>()
            .await;
    }

    #[tokio::test]
    async fn test_login_bad_password() {
        let app = setup().await;
        signup(app.clone(), "alice", "secret").await;

        let response = do_test_login(app, "alice", "wrong").await;
        assert!(response.token.is_none());
        assert!(response.id.is_none());
        assert_eq!(0, response.expires);
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let app = setup().await;

        let error = OneShotBuilder::new(app.clone(), (Method::POST, "/users/"))
            .send_json(json!({"username": "", "password": "x"}))
            .await
            .expect_status(StatusCode::BAD_REQUEST)
            .expect_error("Invalid data")
            .await;
        assert!(error.errors.is_some());

        let error = OneShotBuilder::new(app, (Method::POST, "/users/"))
            .send_json(json!({"username": "datetime(1970-01-01T00:00:00Z)", "password": "x"}))
            .await
            .expect_status(StatusCode::BAD_REQUEST)
            .expect_error("Invalid data")
            .await;
        assert!(error.errors.is_some());
    }

    #[tokio::test]
    async fn test_root_lists_resources() {
        let index = OneShotBuilder::new(setup().await, (Method::GET, "/"))
            .send_empty()
            .await
            .expect_json::<Value>()
            .await;
        assert_eq!(json!({"users": "/users/", "tokens": "/tokens/"}), index);
    }

    #[tokio::test]
    async fn test_users_cannot_be_filtered_by_password() {
        let app = setup().await;
        signup(app.clone(), "alice", "secret").await;
        let token = do_test_login(app.clone(), "alice", "secret").await.token.unwrap();

        let users = OneShotBuilder::new(app.clone(), (Method::GET, "/users/"))
            .with_basic_auth(token.as_str(), "")
            .with_query([("username", "alice")])
            .send_empty()
            .await
            .expect_json::<Vec<Value>>()
            .await;
        assert_eq!(1, users.len());

        OneShotBuilder::new(app, (Method::GET, "/users/"))
            .with_basic_auth(token.as_str(), "")
            .with_query([("password", "secret")])
            .send_empty()
            .await
            .expect_status(StatusCode::BAD_REQUEST)
            .expect_error("Cannot filter users by password")
            .await;
    }

    #[tokio::test]
    async fn test_patch_keeps_password_hash() {
        let app = setup().await;
        let id = signup(app.clone(), "alice", "secret").await;
        let token = do_test_login(app.clone(), "alice", "secret").await.token.unwrap();

        OneShotBuilder::new(app.clone(), (Method::PATCH, format!("/users/{}/", id)))
            .with_bearer_auth(token.as_str())
            .send_json(json!([{"op": "replace", "path": "/username", "value": "alicia"}]))
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        let response = do_test_login(app, "alicia", "secret").await;
        assert!(response.token.is_some());
    }

    #[tokio::test]
    async fn test_patch_invalid_result() {
        let app = setup().await;
        let id = signup(app.clone(), "alice", "secret").await;
        let token = do_test_login(app.clone(), "alice", "secret").await.token.unwrap();

        let error = OneShotBuilder::new(app.clone(), (Method::PATCH, format!("/users/{}/", id)))
            .with_bearer_auth(token.as_str())
            .send_json(json!([{"op": "remove", "path": "/username"}]))
            .await
            .expect_status(StatusCode::BAD_REQUEST)
            .expect_error("missing field")
            .await;
        assert!(error.errors.is_some());

        let user = OneShotBuilder::new(app, (Method::GET, format!("/users/{}/", id)))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_json::<Value>()
            .await;
        assert_eq!(json!("alice"), user["username"]);
    }
}
