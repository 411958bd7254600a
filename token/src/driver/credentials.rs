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

//! Validation of usernames and passwords.

use crate::db;
use crate::model::{HashedPassword, Password};
use async_trait::async_trait;
use rsrc_core::db::DocumentStore;
use rsrc_core::driver::DriverResult;
use rsrc_core::model::DocumentId;
use serde_json::Value;
use std::sync::Arc;

/// Mechanism to map a username and password pair to the identifier of a user.
#[async_trait]
pub trait CredentialLookup: Send + Sync {
    /// Returns the identifier of the user that matches `username` and `password`, or `None` if
    /// there is no such user or the password is wrong.
    async fn lookup(&self, username: &str, password: Password)
    -> DriverResult<Option<DocumentId>>;

    /// Checks whether the user `id` still exists.
    ///
    /// Tokens of users that no longer exist are rejected, and such users cannot log out.
    async fn exists(&self, id: DocumentId) -> DriverResult<bool>;
}

/// Credentials stored in a users collection.
///
/// Users are matched by their `username` field and their `password` field must hold a bcrypt
/// hash of the password.
#[derive(Clone)]
pub struct StoreCredentials {
    /// Collection that holds the users.
    users: Arc<dyn DocumentStore>,
}

impl StoreCredentials {
    /// Creates a lookup against the `users` collection.
    pub fn new(users: Arc<dyn DocumentStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CredentialLookup for StoreCredentials {
    async fn lookup(
        &self,
        username: &str,
        password: Password,
    ) -> DriverResult<Option<DocumentId>> {
        let user = match db::find_user_by_username(self.users.as_ref(), username).await? {
            Some(user) => user,
            None => return Ok(None),
        };
        let id = match user.id() {
            Some(id) => id,
            None => return Ok(None),
        };

        let hash = match user.get(db::PASSWORD_FIELD) {
            Some(Value::String(raw)) => match HashedPassword::new(raw.as_str()) {
                Ok(hash) => hash,
                Err(e) => {
                    log::warn!("User {} has an unusable password: {}", id, e);
                    return Ok(None);
                }
            },
            _ => {
                log::warn!("User {} has no password", id);
                return Ok(None);
            }
        };

        match password.verify(&hash) {
            Ok(true) => Ok(Some(id)),
            Ok(false) => Ok(None),
            Err(e) => {
                log::warn!("Cannot verify password of user {}: {}", id, e);
                Ok(None)
            }
        }
    }

    async fn exists(&self, id: DocumentId) -> DriverResult<bool> {
        Ok(db::user_exists(self.users.as_ref(), id).await?)
    }
}
