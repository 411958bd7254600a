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

//! Extends the driver with the `login` method.

use crate::db;
use crate::driver::TokenDriver;
use crate::model::{Password, Token, UserSecret};
use derive_getters::Getters;
use rsrc_core::clocks::Clock;
use rsrc_core::driver::DriverResult;
use rsrc_core::model::DocumentId;
use serde_json::{Map, Value};
use std::time::Duration;

/// Name of the claim that carries the identifier of the user.
pub(crate) const USER_CLAIM: &str = "pk";

/// Result of a login attempt.
#[derive(Debug, Getters)]
pub struct LoginOutcome {
    /// The new token, or `None` if the credentials were rejected.
    token: Option<Token>,

    /// Lifetime of the token, or zero if the credentials were rejected.
    expires: Duration,

    /// Identifier of the user that logged in, or `None` if the credentials were rejected.
    id: Option<DocumentId>,
}

impl LoginOutcome {
    /// Creates the outcome of a login attempt with bad credentials.
    fn rejected() -> Self {
        Self { token: None, expires: Duration::ZERO, id: None }
    }
}

impl TokenDriver {
    /// Issues a token for the user that matches `username` and `password`.
    ///
    /// The token is valid for `ttl` or, if not given, for the configured default lifetime.  Bad
    /// credentials are not an error: they yield an outcome without a token.
    pub async fn login(
        &self,
        username: &str,
        password: Password,
        ttl: Option<Duration>,
    ) -> DriverResult<LoginOutcome> {
        let id = match self.credentials.lookup(username, password).await? {
            Some(id) => id,
            None => {
                log::info!("Rejected login attempt for {}", username);
                return Ok(LoginOutcome::rejected());
            }
        };

        let secret = match db::get_secret(self.secrets.as_ref(), id).await? {
            Some(secret) => secret,
            None => {
                let secret = UserSecret::generate();
                db::put_secret(self.secrets.as_ref(), id, &secret).await?;
                secret
            }
        };

        let ttl = ttl.unwrap_or(self.opts.token_expires);
        let mut payload = Map::new();
        payload.insert(USER_CLAIM.to_owned(), Value::String(id.to_string()));
        let token = self.signer.mint(&secret, payload, ttl, self.clock.now_utc());

        log::info!("User {} logged in as {}", username, id);
        Ok(LoginOutcome { token: Some(token), expires: ttl, id: Some(id) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;
    use crate::model::{Signer, peek};
    use rsrc_core::model::Identity;
    use serde_json::json;

    #[tokio::test]
    async fn test_login_ok_first_time() {
        let context = TestContext::setup();
        let id = context.create_user("alice", "secret").await;

        let outcome =
            context.driver().login("alice", Password::from("secret"), None).await.unwrap();
        assert_eq!(Some(id), *outcome.id());
        assert_eq!(Duration::from_secs(3600), *outcome.expires());

        let secret = db::get_secret(context.secrets().as_ref(), id).await.unwrap().unwrap();
        let now = context.clock().now_utc();
        let claims = Signer::new("test-secret-key")
            .verify(&secret, outcome.token().as_ref().unwrap(), now)
            .unwrap();
        assert_eq!(Some(&json!(id.to_string())), claims.get(USER_CLAIM));
        assert_eq!(Some(&json!(now.unix_timestamp() + 3600)), claims.get("exp"));
    }

    #[tokio::test]
    async fn test_login_ok_returning_keeps_secret() {
        let context = TestContext::setup();
        let id = context.create_user("alice", "secret").await;

        let driver = context.driver();
        let outcome1 = driver.login("alice", Password::from("secret"), None).await.unwrap();
        let secret1 = db::get_secret(context.secrets().as_ref(), id).await.unwrap().unwrap();
        let outcome2 = driver.login("alice", Password::from("secret"), None).await.unwrap();
        let secret2 = db::get_secret(context.secrets().as_ref(), id).await.unwrap().unwrap();
        assert_eq!(secret1, secret2);

        driver.verify(outcome1.token().clone().unwrap()).await.unwrap();
        driver.verify(outcome2.token().clone().unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_login_custom_ttl() {
        let context = TestContext::setup();
        context.create_user("alice", "secret").await;

        let ttl = Duration::from_secs(60);
        let outcome =
            context.driver().login("alice", Password::from("secret"), Some(ttl)).await.unwrap();
        assert_eq!(ttl, *outcome.expires());

        let claims = peek(outcome.token().as_ref().unwrap()).unwrap();
        let now = context.clock().now_utc().unix_timestamp();
        assert_eq!(Some(&json!(now)), claims.get("iat"));
        assert_eq!(Some(&json!(now + 60)), claims.get("exp"));
    }

    #[tokio::test]
    async fn test_login_invalid_password() {
        let context = TestContext::setup();
        let id = context.create_user("alice", "secret").await;

        let outcome = context.driver().login("alice", Password::from("wrong"), None).await.unwrap();
        assert!(outcome.token().is_none());
        assert!(outcome.id().is_none());
        assert_eq!(Duration::ZERO, *outcome.expires());

        assert!(db::get_secret(context.secrets().as_ref(), id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let context = TestContext::setup();

        let outcome = context
            .driver()
            .login("nobody", Password::from("x"), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(outcome.token().is_none());
        assert_eq!(Duration::ZERO, *outcome.expires());
    }

    #[tokio::test]
    async fn test_login_custom_credentials() {
        /// Lookup that only knows about the user `fixed`.
        struct FixedCredentials(DocumentId);

        #[async_trait::async_trait]
        impl crate::driver::CredentialLookup for FixedCredentials {
            async fn lookup(
                &self,
                username: &str,
                _password: Password,
            ) -> DriverResult<Option<DocumentId>> {
                Ok(if username == "fixed" { Some(self.0) } else { None })
            }

            async fn exists(&self, id: DocumentId) -> DriverResult<bool> {
                Ok(id == self.0)
            }
        }

        let context = TestContext::setup();
        let id = DocumentId::generate();
        let driver = context.driver().with_credentials(FixedCredentials(id));

        let outcome = driver.login("fixed", Password::from("anything"), None).await.unwrap();
        assert_eq!(Some(id), *outcome.id());
        let token = outcome.token().clone().unwrap();
        let identity = driver.verify(token).await.unwrap();
        assert_eq!(Identity::new(id.to_string()), identity);

        driver.logout(&identity, id).await.unwrap();
        let outcome = driver.login("fixed", Password::from("anything"), None).await.unwrap();
        driver.verify(outcome.token().clone().unwrap()).await.unwrap();

        let outcome = driver.login("other", Password::from("anything"), None).await.unwrap();
        assert!(outcome.token().is_none());
    }
}
