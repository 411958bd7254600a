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

//! Data types of the sample service.

use rsrc_core::form::{FormErrors, Schema};
use rsrc_token::model::{HashedPassword, Password};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Prefix of the wire representation of dates.
const DATETIME_PREFIX: &str = "datetime(";

/// Fields accepted for the documents of the `users` collection.
#[derive(Deserialize, Serialize, Validate)]
pub(crate) struct UserSchema {
    /// Name used to log in.
    #[validate(length(min = 1, max = 64, message = "Must have 1 to 64 characters"))]
    username: String,

    /// Password in plain text on input, always a hash once normalized.
    #[validate(length(min = 1, max = 72, message = "Must have 1 to 72 characters"))]
    password: String,

    /// Date when the user signed up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_joined: Option<String>,
}

impl Schema for UserSchema {
    fn normalize(mut self) -> Result<Self, FormErrors> {
        if self.username.starts_with(DATETIME_PREFIX) {
            return Err(FormErrors::field("username", "Cannot be a datetime(...) value"));
        }
        if let Some(date_joined) = self.date_joined.as_ref() {
            if !date_joined.starts_with(DATETIME_PREFIX) {
                return Err(FormErrors::field("date_joined", "Must be a datetime(...) value"));
            }
        }

        // Documents read back from the collection already carry the hash, so writing them again
        // must not hash it twice.
        if !HashedPassword::is_hash(&self.password) {
            let password = Password::new(self.password)
                .map_err(|e| FormErrors::field("password", e.to_string()))?;
            let hash = password.hash().map_err(|e| FormErrors::Global(e.to_string()))?;
            self.password = hash.as_str().to_owned();
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsrc_core::form::{Form, TypedForm};
    use serde_json::{Value, json};

    #[test]
    fn test_password_is_hashed() {
        let form = TypedForm::<UserSchema>::default();
        let fields = form.validate(json!({"username": "alice", "password": "secret"})).unwrap();

        let hash = HashedPassword::new(fields["password"].as_str().unwrap()).unwrap();
        assert!(Password::from("secret").verify(&hash).unwrap());
        assert_eq!(json!("alice"), fields["username"]);
        assert!(!fields.contains_key("date_joined"));
    }

    #[test]
    fn test_hash_is_kept() {
        let form = TypedForm::<UserSchema>::default();
        let hash = Password::from("secret").hash().unwrap();
        let fields = form
            .validate(json!({
                "username": "alice",
                "password": hash.as_str(),
                "date_joined": "datetime(2014-10-25T00:00:00Z)",
            }))
            .unwrap();
        assert_eq!(
            json!({
                "username": "alice",
                "password": hash.as_str(),
                "date_joined": "datetime(2014-10-25T00:00:00Z)",
            }),
            Value::Object(fields)
        );
    }

    #[test]
    fn test_errors() {
        let form = TypedForm::<UserSchema>::default();

        match form.validate(json!({"username": "", "password": ""})).unwrap_err() {
            FormErrors::Fields(fields) => {
                assert_eq!("Must have 1 to 64 characters", fields["username"]);
                assert_eq!("Must have 1 to 72 characters", fields["password"]);
            }
            e => panic!("{:?}", e),
        }

        assert_eq!(
            FormErrors::field("username", "Cannot be a datetime(...) value"),
            form.validate(json!({"username": "datetime(1970-01-01T00:00:00Z)", "password": "b"}))
                .unwrap_err()
        );

        assert_eq!(
            FormErrors::field("date_joined", "Must be a datetime(...) value"),
            form.validate(json!({"username": "a", "password": "b", "date_joined": "today"}))
                .unwrap_err()
        );
    }
}
