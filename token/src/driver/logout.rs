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

//! Extends the driver with the `logout` method.

use crate::db;
use crate::driver::TokenDriver;
use crate::model::UserSecret;
use rsrc_core::driver::{DriverError, DriverResult};
use rsrc_core::model::{DocumentId, Identity};

impl TokenDriver {
    /// Invalidates all tokens of the user `target` by rotating its secret.
    ///
    /// Callers can only log themselves out: any `target` other than the caller's own `identity`
    /// is reported as not found, exactly like a user that does not exist.
    pub async fn logout(&self, identity: &Identity, target: DocumentId) -> DriverResult<()> {
        if identity.as_str() != target.to_string()
            || !self.credentials.exists(target).await?
        {
            return Err(DriverError::NotFound(format!("User {} not found", target)));
        }

        db::put_secret(self.secrets.as_ref(), target, &UserSecret::generate()).await?;
        log::info!("User {} logged out", target);
        Ok(())
    }
}
