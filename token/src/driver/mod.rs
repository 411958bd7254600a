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

//! Business logic for token authentication.

use crate::model::{Signer, TokenError};
use rsrc_core::clocks::Clock;
use rsrc_core::db::DocumentStore;
use rsrc_core::driver::DriverError;
use rsrc_core::env::{get_optional_var, get_required_var};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

mod credentials;
pub use credentials::{CredentialLookup, StoreCredentials};
mod login;
pub use login::LoginOutcome;
mod logout;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
mod verify;

/// Default value for the `TOKEN_EXPIRES` setting when not specified.
const DEFAULT_TOKEN_EXPIRES_SECONDS: u64 = 60 * 60;

/// Configuration options for the token driver.
#[derive(Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct TokenOptions {
    /// Global secret mixed into the key of every token.
    pub secret_key: String,

    /// Lifetime of the tokens issued when the caller does not request one.
    pub token_expires: Duration,
}

impl TokenOptions {
    /// Creates a new set of options with the global `secret_key` and default values for the
    /// remaining settings.
    pub fn new<S: Into<String>>(secret_key: S) -> Self {
        Self {
            secret_key: secret_key.into(),
            token_expires: Duration::from_secs(DEFAULT_TOKEN_EXPIRES_SECONDS),
        }
    }

    /// Creates a new set of options from environment variables.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let secret_key = get_required_var::<String>(prefix, "SECRET_KEY")?;
        if secret_key.is_empty() {
            return Err(format!("Environment variable {}_SECRET_KEY cannot be empty", prefix));
        }
        Ok(Self {
            secret_key,
            token_expires: get_optional_var::<Duration>(prefix, "TOKEN_EXPIRES")?
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_TOKEN_EXPIRES_SECONDS)),
        })
    }
}

impl fmt::Debug for TokenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenOptions")
            .field("secret_key", &"scrubbed")
            .field("token_expires", &self.token_expires)
            .finish()
    }
}

impl From<TokenError> for DriverError {
    fn from(e: TokenError) -> Self {
        DriverError::Unauthorized(e.to_string())
    }
}

/// Business logic.
///
/// The driver is cheap to clone: all of its state lives behind `Arc`s and is shared by all
/// request handlers.
#[derive(Clone)]
pub struct TokenDriver {
    /// Collection that holds the per-user secrets.
    secrets: Arc<dyn DocumentStore>,

    /// Mechanism to validate usernames and passwords and to check that users still exist.
    credentials: Arc<dyn CredentialLookup>,

    /// Clock instance to obtain the current time.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Mints and verifies tokens.
    signer: Signer,

    /// Configuration options.
    opts: TokenOptions,
}

impl TokenDriver {
    /// Creates a new driver backed by the `users` and `secrets` collections.
    ///
    /// Credentials are checked against the `username` and `password` fields of `users`.  Use
    /// `with_credentials` to plug in a different mechanism.
    pub fn new(
        users: Arc<dyn DocumentStore>,
        secrets: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock + Send + Sync>,
        opts: TokenOptions,
    ) -> Self {
        let credentials = Arc::new(StoreCredentials::new(users));
        let signer = Signer::new(opts.secret_key.as_bytes());
        Self { secrets, credentials, clock, signer, opts }
    }

    /// Replaces the mechanism used to validate usernames and passwords.
    ///
    /// `credentials` becomes the authority on which users exist, so tokens issued to the users it
    /// returns can be verified even if they are not in the users collection.
    pub fn with_credentials<C: CredentialLookup + 'static>(mut self, credentials: C) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }

    /// Returns the configuration options of the driver.
    pub fn opts(&self) -> &TokenOptions {
        &self.opts
    }
}
