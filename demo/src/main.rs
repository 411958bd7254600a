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

//! Entry point to the sample service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use rsrc_core::env::get_optional_var;
use rsrc_demo::serve;
use rsrc_token::driver::TokenOptions;
use std::net::Ipv4Addr;

/// Prefix of the environment variables that configure the service.
const ENV_PREFIX: &str = "DEMO";

/// Port to listen on when `DEMO_PORT` is not set.
const DEFAULT_PORT: u16 = 5000;

/// Database to use when `DEMO_DB_URL` is not set.
const DEFAULT_DB_URL: &str = "sqlite://demo.db?mode=rwc";

#[tokio::main]
async fn main() {
    env_logger::init();

    let port = get_optional_var::<u16>(ENV_PREFIX, "PORT").unwrap().unwrap_or(DEFAULT_PORT);
    let addr = (Ipv4Addr::LOCALHOST, port);

    let db_url = get_optional_var::<String>(ENV_PREFIX, "DB_URL")
        .unwrap()
        .unwrap_or_else(|| DEFAULT_DB_URL.to_owned());
    let opts = TokenOptions::from_env(ENV_PREFIX).unwrap();

    serve(addr, &db_url, opts).await.unwrap()
}
