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

//! Translation of query strings into storage filters.

use crate::db::Filter;
use crate::rest::RestResult;
use crate::serializer::{ID_FIELD, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Converts the query parameters of a list request into a `Filter`.
///
/// The `serializer` of the resource is handed over so that wire values such as identifiers can be
/// decoded into their stored form.
pub trait QueryFilter: Send + Sync {
    /// Builds the filter for `query`, or rejects the query with an error.
    fn to_filter(
        &self,
        query: &BTreeMap<String, String>,
        serializer: &dyn Serializer,
    ) -> RestResult<Filter>;
}

/// Filter that requires every query parameter to match a field exactly.
///
/// Values are interpreted as JSON literals when they parse as such and as strings otherwise,
/// except for the identifier which is always a string.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactFilter;

impl QueryFilter for ExactFilter {
    fn to_filter(
        &self,
        query: &BTreeMap<String, String>,
        serializer: &dyn Serializer,
    ) -> RestResult<Filter> {
        let mut object = Map::new();
        for (name, raw) in query {
            let value = if name == ID_FIELD {
                Value::String(raw.clone())
            } else {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
            };
            object.insert(name.clone(), value);
        }
        let (id, fields) = serializer.decode(Value::Object(object))?.into_parts();
        Ok(Filter::new(id, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, DocumentId};
    use crate::rest::RestError;
    use crate::serializer::PlainSerializer;
    use serde_json::json;

    /// Shorthand to build a query map from string pairs.
    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    /// Shorthand to build a document with `fields` and no identifier.
    fn doc(fields: Value) -> Document {
        match fields {
            Value::Object(fields) => Document::new(fields),
            _ => panic!("Fields must be an object"),
        }
    }

    #[test]
    fn test_exact_filter_empty_matches_all() {
        let filter = ExactFilter.to_filter(&query(&[]), &PlainSerializer).unwrap();
        assert!(filter.matches(&doc(json!({"a": 1}))));
        assert!(filter.id().is_none());
    }

    #[test]
    fn test_exact_filter_json_literals() {
        let filter = ExactFilter
            .to_filter(&query(&[("age", "3"), ("admin", "true"), ("name", "bob")]), &PlainSerializer)
            .unwrap();
        assert!(filter.matches(&doc(json!({"age": 3, "admin": true, "name": "bob", "x": 0}))));
        assert!(!filter.matches(&doc(json!({"age": "3", "admin": true, "name": "bob"}))));
    }

    #[test]
    fn test_exact_filter_id() {
        let id = DocumentId::generate();
        let filter =
            ExactFilter.to_filter(&query(&[(ID_FIELD, &id.to_string())]), &PlainSerializer).unwrap();
        assert_eq!(Some(id), filter.id());
    }

    #[test]
    fn test_exact_filter_bad_id() {
        match ExactFilter.to_filter(&query(&[(ID_FIELD, "123")]), &PlainSerializer) {
            Err(RestError::InvalidRequest(_)) => (),
            e => panic!("{:?}", e),
        }
    }
}
