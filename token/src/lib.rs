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

//! Token authentication for rsrc services.
//!
//! Callers exchange their username and password for a signed token by posting to the `tokens`
//! resource and then present that token on every request to resources protected by a
//! `TokenGuard`.  Tokens carry their own expiration time and are signed with a global secret
//! combined with a per-user secret.  Logging out rotates the per-user secret, which invalidates
//! every token previously issued to that user without having to keep track of them.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub(crate) mod db;
pub mod driver;
pub mod model;
pub mod rest;
