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

//! Authentication of requests with tokens.

use crate::driver::TokenDriver;
use crate::rest::get_token_auth;
use async_trait::async_trait;
use http::HeaderMap;
use rsrc_core::model::Identity;
use rsrc_core::rest::{Guard, RestError, RestResult};

/// Guard that only lets through requests that carry a valid token.
#[derive(Clone)]
pub struct TokenGuard {
    /// Driver that verifies the tokens.
    driver: TokenDriver,
}

impl TokenGuard {
    /// Creates a guard that verifies tokens with `driver`.
    pub fn new(driver: TokenDriver) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Guard for TokenGuard {
    async fn authenticate(&self, headers: &HeaderMap) -> RestResult<Identity> {
        let token = get_token_auth(headers)?;
        match self.driver.verify(token).await {
            Ok(identity) => Ok(identity),
            Err(e) => {
                let e = RestError::from(e);
                if let RestError::Unauthorized(ref message) = e {
                    log::warn!("Rejected token: {}", message);
                }
                Err(e)
            }
        }
    }
}
