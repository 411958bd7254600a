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

//! Query filter for the `users` collection.

use rsrc_core::db::Filter;
use rsrc_core::filter::{ExactFilter, QueryFilter};
use rsrc_core::rest::{RestError, RestResult};
use rsrc_core::serializer::Serializer;
use std::collections::BTreeMap;

/// Filter that matches users exactly but refuses to search by password hash.
pub(crate) struct UserFilter;

impl QueryFilter for UserFilter {
    fn to_filter(
        &self,
        query: &BTreeMap<String, String>,
        serializer: &dyn Serializer,
    ) -> RestResult<Filter> {
        if query.contains_key("password") {
            return Err(RestError::InvalidRequest("Cannot filter users by password".to_owned()));
        }
        ExactFilter.to_filter(query, serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsrc_core::model::Document;
    use rsrc_core::serializer::ExtendedJsonSerializer;
    use serde_json::{Map, json};

    #[test]
    fn test_username() {
        let mut query = BTreeMap::default();
        query.insert("username".to_owned(), "alice".to_owned());
        let filter = UserFilter.to_filter(&query, &ExtendedJsonSerializer).unwrap();

        let mut fields = Map::new();
        fields.insert("username".to_owned(), json!("alice"));
        assert!(filter.matches(&Document::new(fields)));
    }

    #[test]
    fn test_password_rejected() {
        let mut query = BTreeMap::default();
        query.insert("password".to_owned(), "$2b$10$whatever".to_owned());
        match UserFilter.to_filter(&query, &ExtendedJsonSerializer) {
            Err(RestError::InvalidRequest(e)) => assert!(e.contains("password")),
            e => panic!("{:?}", e),
        }
    }
}
