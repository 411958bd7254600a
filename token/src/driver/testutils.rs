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

//! Utilities to help testing services that integrate with token authentication.

use crate::db;
use crate::driver::{TokenDriver, TokenOptions};
use crate::model::{Password, Token};
use rsrc_core::clocks::testutils::SettableClock;
use rsrc_core::db::DocumentStore;
use rsrc_core::db::memory::MemoryStore;
use rsrc_core::model::{Document, DocumentId};
use serde_json::{Map, Value};
use std::sync::Arc;
use time::OffsetDateTime;

/// Password assigned to the users created by `do_test_login`.
pub const TEST_PASSWORD: &str = "test0password";

/// State of a running test.
pub struct TestContext {
    /// Collection that holds the users.
    users: Arc<dyn DocumentStore>,

    /// Collection that holds the per-user secrets.
    secrets: Arc<dyn DocumentStore>,

    /// The clock used by the driver, which the tests can move at will.
    clock: Arc<SettableClock>,

    /// The driver to handle authentication flows.
    driver: TokenDriver,
}

impl TestContext {
    /// Initializes the driver using in-memory collections and a settable clock.
    pub fn setup() -> Self {
        let users = Arc::new(MemoryStore::default());
        let secrets = Arc::new(MemoryStore::default());
        Self::setup_with(TokenOptions::new("test-secret-key"), users, secrets)
    }

    /// Initializes the test context using the given already-initialized objects.
    pub fn setup_with(
        opts: TokenOptions,
        users: Arc<dyn DocumentStore>,
        secrets: Arc<dyn DocumentStore>,
    ) -> Self {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let clock = Arc::new(SettableClock::new(now));
        let driver = TokenDriver::new(users.clone(), secrets.clone(), clock.clone(), opts);
        Self { users, secrets, clock, driver }
    }

    /// Syntactic sugar to create a user with a hashed `password` for testing purposes.
    pub async fn create_user(&self, username: &str, password: &str) -> DocumentId {
        let hash = Password::new(password).unwrap().hash().unwrap();
        let mut fields = Map::new();
        fields.insert(db::USERNAME_FIELD.to_owned(), Value::String(username.to_owned()));
        fields.insert(db::PASSWORD_FIELD.to_owned(), Value::String(hash.as_str().to_owned()));
        self.users.insert(Document::new(fields)).await.unwrap()
    }

    /// Syntactic sugar to create and log a user in for testing purposes.
    pub async fn do_test_login(&self, username: &str) -> (DocumentId, Token) {
        let id = self.create_user(username, TEST_PASSWORD).await;
        let outcome =
            self.driver.login(username, Password::new(TEST_PASSWORD).unwrap(), None).await.unwrap();
        assert_eq!(Some(id), *outcome.id());
        (id, outcome.token().clone().unwrap())
    }

    /// Gets a copy of the driver in this test context.
    pub fn driver(&self) -> TokenDriver {
        self.driver.clone()
    }

    /// Gets access to the clock used by the driver.
    pub fn clock(&self) -> &SettableClock {
        &self.clock
    }

    /// Gets access to the users collection.
    pub fn users(&self) -> Arc<dyn DocumentStore> {
        self.users.clone()
    }

    /// Gets access to the secrets collection.
    pub fn secrets(&self) -> Arc<dyn DocumentStore> {
        self.secrets.clone()
    }
}
