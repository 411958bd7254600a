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

//! The `Document` and `DocumentId` data types.

use crate::model::{ModelError, ModelResult};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use time::OffsetDateTime;

/// Length of a binary document identifier, in bytes.
const ID_LENGTH: usize = 12;

/// Counter to disambiguate identifiers generated within the same second.
static ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Binary identifier of a stored document.
///
/// Identifiers are composed of a 4-byte creation timestamp (in seconds), 5 random bytes and a
/// 3-byte counter, all big-endian.  Their textual representation is exactly 24 lowercase hex
/// characters and is the only one accepted when parsing, so converting an identifier to a string
/// and back always yields the same identifier.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DocumentId([u8; ID_LENGTH]);

impl DocumentId {
    /// Generates a new identifier for a document created now.
    pub fn generate() -> Self {
        let secs = OffsetDateTime::now_utc().unix_timestamp();
        let secs = u32::try_from(secs).unwrap_or(u32::MAX);
        let random: [u8; 5] = rand::random();
        let counter = ID_COUNTER.fetch_add(1, Ordering::SeqCst);

        let mut bytes = [0u8; ID_LENGTH];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&random);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        Self(bytes)
    }

    /// Creates an identifier from its raw bytes.
    pub fn from_bytes(bytes: [u8; ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parses an identifier from its canonical textual representation `s`.
    pub fn parse(s: &str) -> ModelResult<Self> {
        if s.len() != ID_LENGTH * 2 {
            return Err(ModelError(format!("Invalid identifier '{}': bad length", s)));
        }
        if !s.chars().all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch)) {
            return Err(ModelError(format!("Invalid identifier '{}': not lowercase hex", s)));
        }

        let mut bytes = [0u8; ID_LENGTH];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| ModelError(format!("Invalid identifier '{}': {}", s, e)))?;
        Ok(Self(bytes))
    }

    /// Returns the raw bytes of the identifier.
    pub fn as_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.0
    }
}

impl FromStr for DocumentId {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        DocumentId::parse(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self)
    }
}

/// A document in its storage-native representation.
///
/// The identifier is kept apart from the fields because backends index documents by it.  Values
/// that have no direct JSON counterpart use tagged objects, such as `{"$date": <millis>}` for
/// timestamps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    /// Identifier of the document, if it has been assigned one yet.
    id: Option<DocumentId>,

    /// Ordered fields of the document.
    fields: Map<String, Value>,
}

impl Document {
    /// Creates a new document without an identifier.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { id: None, fields }
    }

    /// Sets the identifier of the document.
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns the identifier of the document, if any.
    pub fn id(&self) -> Option<DocumentId> {
        self.id
    }

    /// Replaces the identifier of the document.
    pub fn set_id(&mut self, id: Option<DocumentId>) {
        self.id = id;
    }

    /// Returns the value of the field `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns the fields of the document.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns a mutable view of the fields of the document.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    /// Consumes the document and returns its identifier and its fields.
    pub fn into_parts(self) -> (Option<DocumentId>, Map<String, Value>) {
        (self.id, self.fields)
    }
}
