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

//! Conversions between storage-native documents and their wire representation.

use crate::model::{Document, DocumentId, ModelError, ModelResult};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Name of the wire field that carries the document identifier.
pub const ID_FIELD: &str = "_id";

/// Name of the tag used to store dates natively.
const DATE_TAG: &str = "$date";

/// Converter between documents and wire objects.
///
/// The identifier travels in the `_id` wire field as its canonical string.  Implementations
/// customize how individual values are represented by overriding `encode_value` and
/// `decode_value`, which must be inverses of each other for the values they accept.
pub trait Serializer: Send + Sync {
    /// Converts a native `value` to its wire representation.
    fn encode_value(&self, value: Value) -> Value {
        value
    }

    /// Converts a wire `value` to its native representation.
    fn decode_value(&self, value: Value) -> ModelResult<Value> {
        Ok(value)
    }

    /// Converts the document identifier `id` to its wire representation.
    fn encode_id(&self, id: DocumentId) -> Value {
        Value::String(id.to_string())
    }

    /// Parses the wire representation `raw` of a document identifier.
    fn decode_id(&self, raw: &str) -> ModelResult<DocumentId> {
        DocumentId::parse(raw)
    }

    /// Converts `doc` to its wire representation.
    fn encode(&self, doc: &Document) -> Value {
        let mut object = Map::with_capacity(doc.fields().len() + 1);
        if let Some(id) = doc.id() {
            object.insert(ID_FIELD.to_owned(), self.encode_id(id));
        }
        for (name, value) in doc.fields() {
            object.insert(name.clone(), self.encode_value(value.clone()));
        }
        Value::Object(object)
    }

    /// Converts the wire `value` into a document.
    fn decode(&self, value: Value) -> ModelResult<Document> {
        let mut object = match value {
            Value::Object(object) => object,
            _ => return Err(ModelError("Documents must be JSON objects".to_owned())),
        };

        let id = match object.shift_remove(ID_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(self.decode_id(&raw)?),
            Some(_) => return Err(ModelError(format!("Field {} must be a string", ID_FIELD))),
        };

        let mut fields = Map::with_capacity(object.len());
        for (name, value) in object {
            fields.insert(name, self.decode_value(value)?);
        }

        let mut doc = Document::new(fields);
        doc.set_id(id);
        Ok(doc)
    }
}

/// Serializer that exposes native values untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainSerializer;

impl Serializer for PlainSerializer {}

/// Serializer that exposes native dates as strings of the form `datetime(<RFC 3339>)`.
///
/// Values are converted recursively, so dates nested in arrays or objects are supported too.
///
/// Strings of the form `datetime(...)` are reserved: any such string in any field is decoded as
/// a date or rejected if it is not a valid one.  Forms that accept free text should refuse them
/// unless the field is meant to hold a date.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtendedJsonSerializer;

impl ExtendedJsonSerializer {
    /// Returns the formatted date if `object` is a native date, or `None` otherwise.
    fn format_date(object: &Map<String, Value>) -> Option<String> {
        if object.len() != 1 {
            return None;
        }
        let millis = object.get(DATE_TAG)?.as_i64()?;
        let ts = OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()?;
        let formatted = ts.format(&Rfc3339).ok()?;
        Some(format!("datetime({})", formatted))
    }

    /// Parses a wire date `raw` of the form `datetime(<RFC 3339>)`, returning `None` if `raw` does
    /// not have that shape.
    fn parse_date(raw: &str) -> Option<ModelResult<Value>> {
        let inner = raw.strip_prefix("datetime(")?.strip_suffix(')')?;
        let result = OffsetDateTime::parse(inner, &Rfc3339)
            .map_err(|e| ModelError(format!("Invalid date '{}': {}", inner, e)))
            .and_then(|ts| {
                let nanos = ts.unix_timestamp_nanos();
                if nanos % 1_000_000 != 0 {
                    return Err(ModelError(format!(
                        "Invalid date '{}': sub-millisecond precision not supported",
                        inner
                    )));
                }
                let millis = i64::try_from(nanos / 1_000_000)
                    .map_err(|e| ModelError(format!("Invalid date '{}': {}", inner, e)))?;
                let mut object = Map::new();
                object.insert(DATE_TAG.to_owned(), Value::from(millis));
                Ok(Value::Object(object))
            });
        Some(result)
    }
}

impl Serializer for ExtendedJsonSerializer {
    fn encode_value(&self, value: Value) -> Value {
        match value {
            Value::Object(object) => match Self::format_date(&object) {
                Some(formatted) => Value::String(formatted),
                None => Value::Object(
                    object.into_iter().map(|(k, v)| (k, self.encode_value(v))).collect(),
                ),
            },
            Value::Array(values) => {
                Value::Array(values.into_iter().map(|v| self.encode_value(v)).collect())
            }
            value => value,
        }
    }

    fn decode_value(&self, value: Value) -> ModelResult<Value> {
        match value {
            Value::String(raw) => match Self::parse_date(&raw) {
                Some(result) => result,
                None => Ok(Value::String(raw)),
            },
            Value::Object(object) => {
                let mut decoded = Map::with_capacity(object.len());
                for (k, v) in object {
                    decoded.insert(k, self.decode_value(v)?);
                }
                Ok(Value::Object(decoded))
            }
            Value::Array(values) => {
                let mut decoded = Vec::with_capacity(values.len());
                for v in values {
                    decoded.push(self.decode_value(v)?);
                }
                Ok(Value::Array(decoded))
            }
            value => Ok(value),
        }
    }
}
