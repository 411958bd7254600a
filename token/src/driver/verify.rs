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

//! Extends the driver with the `verify` method.

use crate::db;
use crate::driver::TokenDriver;
use crate::driver::login::USER_CLAIM;
use crate::model::{Token, peek};
use rsrc_core::clocks::Clock;
use rsrc_core::driver::{DriverError, DriverResult};
use rsrc_core::model::{DocumentId, Identity};
use serde_json::Value;

impl TokenDriver {
    /// Resolves `token` to the identity of the user it was issued to.
    ///
    /// The token must carry a valid signature under the current secret of its user and must not
    /// have expired.
    pub async fn verify(&self, token: Token) -> DriverResult<Identity> {
        let claims = peek(&token)?;
        let id = match claims.get(USER_CLAIM) {
            Some(Value::String(raw)) => DocumentId::parse(raw)
                .map_err(|e| DriverError::Unauthorized(format!("Invalid user in token: {}", e)))?,
            _ => return Err(DriverError::Unauthorized("Token has no user".to_owned())),
        };

        if !self.credentials.exists(id).await? {
            return Err(DriverError::Unauthorized(format!("Unknown user {}", id)));
        }
        let secret = match db::get_secret(self.secrets.as_ref(), id).await? {
            Some(secret) => secret,
            None => return Err(DriverError::Unauthorized(format!("User {} is not logged in", id))),
        };

        self.signer.verify(&secret, &token, self.clock.now_utc())?;
        Ok(Identity::new(id.to_string()))
    }
}
