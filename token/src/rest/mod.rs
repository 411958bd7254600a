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

//! REST interface for token authentication.

use crate::driver::TokenDriver;
use http::Method;
use rsrc_core::resource::Resource;

mod guard;
pub use guard::TokenGuard;
mod httputils;
pub use httputils::get_token_auth;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
mod token_view;
pub use token_view::{LoginRequest, LoginResponse, TokenView};

/// Creates the `tokens` resource served by `driver`.
///
/// Anyone can `POST` to the resource to log in, but deleting a token requires presenting one.
pub fn tokens_resource(driver: TokenDriver) -> Resource {
    Resource::builder("tokens")
        .with_guard(TokenGuard::new(driver.clone()))
        .with_public(Method::POST)
        .build::<TokenView>(driver)
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use super::*;
    use http::StatusCode;
    use rsrc_core::rest::testutils::*;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_login_ok() {
        let context = TestContext::setup().await;
        let id = context.create_user("russell", "123456").await;

        let response = do_test_login(context.app(), "russell", "123456").await;
        assert!(response.token.is_some());
        assert_eq!(3600, response.expires);
        assert_eq!(Some(json!(id.to_string())), response.id);
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let context = TestContext::setup().await;
        context.create_user("russell", "123456").await;

        let response = do_test_login(context.app(), "russell", "wrong_password").await;
        assert_eq!(LoginResponse { token: None, expires: 0, id: None }, response);
    }

    #[tokio::test]
    async fn test_logout_without_token() {
        let context = TestContext::setup().await;
        context.create_user("russell", "123456").await;
        let response = do_test_login(context.app(), "russell", "123456").await;
        let id = response.id.unwrap();

        OneShotBuilder::new(context.app(), (Method::DELETE, format!("/tokens/{}/", id_str(&id))))
            .send_empty()
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_error("Missing Authorization header")
            .await;
    }

    #[tokio::test]
    async fn test_logout_with_wrong_id() {
        let context = TestContext::setup().await;
        context.create_user("russell", "123456").await;
        let response = do_test_login(context.app(), "russell", "123456").await;

        OneShotBuilder::new(context.app(), (Method::DELETE, "/tokens/1/"))
            .with_basic_auth(response.token.unwrap().as_str(), "")
            .send_empty()
            .await
            .expect_status(StatusCode::NOT_FOUND)
            .expect_error("not found")
            .await;
    }

    #[tokio::test]
    async fn test_logout_twice() {
        let context = TestContext::setup().await;
        context.create_user("russell", "123456").await;
        let response = do_test_login(context.app(), "russell", "123456").await;
        let uri = format!("/tokens/{}/", id_str(response.id.as_ref().unwrap()));
        let token = response.token.unwrap();

        OneShotBuilder::new(context.app(), (Method::DELETE, &uri))
            .with_basic_auth(token.as_str(), "")
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(context.app(), (Method::DELETE, &uri))
            .with_basic_auth(token.as_str(), "")
            .send_empty()
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_error("signature")
            .await;
    }

    #[tokio::test]
    async fn test_protected_resource_flow() {
        let context = TestContext::setup().await;
        context.create_user("russell", "123456").await;

        OneShotBuilder::new(context.app(), (Method::GET, "/users/"))
            .send_empty()
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_error("Missing Authorization header")
            .await;

        OneShotBuilder::new(context.app(), (Method::GET, "/users/"))
            .with_basic_auth("anonymous", "")
            .send_empty()
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_error("Malformed token")
            .await;

        let response = do_test_login(context.app(), "russell", "123456").await;
        let token = response.token.unwrap();

        let users = OneShotBuilder::new(context.app(), (Method::GET, "/users/"))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(StatusCode::OK)
            .expect_json::<Vec<Value>>()
            .await;
        assert_eq!(1, users.len());
        assert_eq!(json!("russell"), users[0]["username"]);

        let uri = format!("/tokens/{}/", id_str(response.id.as_ref().unwrap()));
        OneShotBuilder::new(context.app(), (Method::DELETE, uri))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(context.app(), (Method::GET, "/users/"))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_error("Unauthorized")
            .await;
    }

    #[tokio::test]
    async fn test_tokens_other_methods() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.app(), (Method::PUT, "/tokens/"))
            .send_json(json!({}))
            .await
            .expect_status(StatusCode::METHOD_NOT_ALLOWED)
            .expect_error("Method not allowed")
            .await;
    }
}
