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

//! High-level data types shared by all layers.
//!
//! There should be no logic in here beyond what is necessary to guarantee that the values of these
//! types are valid at all times.

use derive_more::Display;

mod document;
pub use document::{Document, DocumentId};

/// Errors caused by invalid values in the model.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// Result type for this module.
pub type ModelResult<T> = Result<T, ModelError>;

/// Identity of an authenticated caller, expressed as the wire identifier of its user record.
///
/// Identities have no storage of their own: they only exist as the outcome of validating a
/// credential presented by the caller.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct Identity(String);

impl Identity {
    /// Creates a new identity from the user identifier `id`.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Returns a string view of the identity.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
