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

//! Rudimentary framework to expose document collections as REST resources.
//!
//! Services built using this framework adhere to the following layered architecture:
//!
//! 1.  `model`: This is the base layer, providing the `Document` and `DocumentId` types that
//!     represent what the storage layer holds, plus the `Identity` of authenticated callers.
//!
//! 1.  `db`: This is the persistence layer.  Backends implement the `DocumentStore` trait, which
//!     offers the minimal find/insert/remove/save capability the views need.
//!
//! 1.  `driver`: This is the business logic layer.  Services that need more than plain document
//!     manipulation (such as token authentication) provide their own driver types and report
//!     failures via `DriverError`.
//!
//! 1.  `rest`: This is the HTTP layer.  A `Resource` binds a `View` (usually a `Collection`) to a
//!     `Form`, a `Serializer` and a `QueryFilter` and is mounted onto an `axum::Router` with
//!     `rest::add_resource`.
//!
//! There are result and error types in every layer, such as `DbResult` and `DbError`.  Errors can
//! transparently float to the top of the app using the `?` operator, being translated to HTTP
//! status codes once returned from the REST layer.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod clocks;
pub mod db;
pub mod driver;
pub mod env;
pub mod filter;
pub mod form;
pub mod model;
pub mod resource;
pub mod rest;
pub mod serializer;
pub mod view;
