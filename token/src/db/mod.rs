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

//! Persistence helpers for users and their secrets.
//!
//! Users live in an arbitrary collection whose documents have, at least, a `username` and a
//! `password` field.  Secrets live in their own collection and each one shares its identifier
//! with the user it belongs to.

use crate::model::UserSecret;
use rsrc_core::db::{DbError, DbResult, DocumentStore, Filter};
use rsrc_core::model::{Document, DocumentId};
use serde_json::{Map, Value};

/// Name of the user field that holds the username.
pub(crate) const USERNAME_FIELD: &str = "username";

/// Name of the user field that holds the password hash.
pub(crate) const PASSWORD_FIELD: &str = "password";

/// Name of the secret field that holds the secret itself.
const SECRET_FIELD: &str = "secret";

/// Gets the user whose username is `username`, if any.
pub(crate) async fn find_user_by_username(
    users: &dyn DocumentStore,
    username: &str,
) -> DbResult<Option<Document>> {
    let filter = Filter::all().with_field(USERNAME_FIELD, Value::String(username.to_owned()));
    let mut matches = users.find(&filter).await?;
    if matches.len() > 1 {
        log::warn!("Found {} users with username {}; using the first one", matches.len(), username);
    }
    if matches.is_empty() { Ok(None) } else { Ok(Some(matches.swap_remove(0))) }
}

/// Checks if the user `id` exists.
pub(crate) async fn user_exists(users: &dyn DocumentStore, id: DocumentId) -> DbResult<bool> {
    Ok(users.find_one(id).await?.is_some())
}

/// Gets the current secret of the user `id`, if any.
pub(crate) async fn get_secret(
    secrets: &dyn DocumentStore,
    id: DocumentId,
) -> DbResult<Option<UserSecret>> {
    let doc = match secrets.find_one(id).await? {
        Some(doc) => doc,
        None => return Ok(None),
    };
    match doc.get(SECRET_FIELD) {
        Some(Value::String(raw)) => Ok(Some(UserSecret::new(raw.as_str())?)),
        _ => Err(DbError::DataIntegrityError(format!("Secret of user {} has no value", id))),
    }
}

/// Sets the secret of the user `id` to `secret`, replacing any previous one.
pub(crate) async fn put_secret(
    secrets: &dyn DocumentStore,
    id: DocumentId,
    secret: &UserSecret,
) -> DbResult<()> {
    let mut fields = Map::new();
    fields.insert(SECRET_FIELD.to_owned(), Value::String(secret.as_str().to_owned()));
    secrets.save(Document::new(fields).with_id(id)).await
}
