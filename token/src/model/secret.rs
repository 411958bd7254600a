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

//! The `UserSecret` data type.

use rand::Rng;
use rand::distr::Alphanumeric;
use rsrc_core::model::{ModelError, ModelResult};
use std::fmt;

/// Length of the per-user secrets, in characters.
const SECRET_LENGTH: usize = 32;

/// Per-user component of the key that signs tokens.
///
/// Replacing the secret of a user invalidates all tokens issued to that user until then.
#[derive(Clone, PartialEq)]
pub struct UserSecret(String);

impl UserSecret {
    /// Creates a secret from a stored string.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        if s.len() != SECRET_LENGTH || !s.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(ModelError("Invalid user secret".to_owned()));
        }
        Ok(Self(s))
    }

    /// Generates a new random secret.
    pub fn generate() -> Self {
        let s = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SECRET_LENGTH)
            .map(char::from)
            .collect::<String>();
        Self(s)
    }

    /// Returns a string view of the secret.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed user secret")
    }
}
