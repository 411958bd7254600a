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

//! Validation of incoming wire data.
//!
//! A `Form` turns arbitrary client input into the canonical wire object of a resource, or
//! explains why it cannot.  Forms operate on the wire representation: the serializer takes care
//! of converting the validated object into a storable document afterwards.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use validator::{Validate, ValidationErrors};

/// Reasons why some input failed validation.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormErrors {
    /// Per-field error messages.
    Fields(BTreeMap<String, String>),

    /// A single message that applies to the input as a whole.
    Global(String),
}

impl FormErrors {
    /// Creates an error set with a single `message` for `field`.
    pub fn field<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        let mut fields = BTreeMap::default();
        fields.insert(field.into(), message.into());
        FormErrors::Fields(fields)
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormErrors::Fields(fields) => {
                let mut first = true;
                for (field, message) in fields {
                    if !first {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}: {}", field, message)?;
                    first = false;
                }
                Ok(())
            }
            FormErrors::Global(message) => f.write_str(message),
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(e: ValidationErrors) -> Self {
        let mut fields = BTreeMap::default();
        for (field, errors) in e.field_errors() {
            let messages = errors
                .iter()
                .map(|e| match e.message.as_ref() {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value ({})", e.code),
                })
                .collect::<Vec<String>>();
            fields.insert(field.to_string(), messages.join("; "));
        }
        if fields.is_empty() {
            FormErrors::Global(e.to_string())
        } else {
            FormErrors::Fields(fields)
        }
    }
}

/// Validator of the wire data accepted by a resource.
pub trait Form: Send + Sync {
    /// Validates `data` and returns its canonical object form.
    fn validate(&self, data: Value) -> Result<Map<String, Value>, FormErrors>;
}

/// Form that accepts any JSON object as is.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyForm;

impl Form for AnyForm {
    fn validate(&self, data: Value) -> Result<Map<String, Value>, FormErrors> {
        match data {
            Value::Object(fields) => Ok(fields),
            _ => Err(FormErrors::Global("Expected a JSON object".to_owned())),
        }
    }
}

/// Declarative schema of the objects accepted by a `TypedForm`.
///
/// Field constraints are expressed with the `validator` derive macros.  Unknown fields in the
/// input are dropped.
pub trait Schema: DeserializeOwned + Serialize + Validate {
    /// Normalizes an already-validated object before it is accepted.
    fn normalize(self) -> Result<Self, FormErrors> {
        Ok(self)
    }
}

/// Form that validates its input against the `Schema` `T`.
pub struct TypedForm<T> {
    /// Marker for the schema type.
    _schema: PhantomData<fn() -> T>,
}

impl<T> Default for TypedForm<T> {
    fn default() -> Self {
        Self { _schema: PhantomData }
    }
}

impl<T: Schema> Form for TypedForm<T> {
    fn validate(&self, data: Value) -> Result<Map<String, Value>, FormErrors> {
        if !data.is_object() {
            return Err(FormErrors::Global("Expected a JSON object".to_owned()));
        }

        let object =
            serde_json::from_value::<T>(data).map_err(|e| FormErrors::Global(e.to_string()))?;
        object.validate()?;
        let object = object.normalize()?;

        match serde_json::to_value(object) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(FormErrors::Global("Schema did not serialize to an object".to_owned())),
            Err(e) => Err(FormErrors::Global(e.to_string())),
        }
    }
}
