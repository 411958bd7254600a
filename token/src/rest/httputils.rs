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

//! Utilities to deal with HTTP authorization.

use crate::model::Token;
use base64::Engine;
use base64::engine::general_purpose;
use http::header::HeaderMap;
use rsrc_core::rest::{RestError, RestResult, get_unique_header};

/// Shorthand to build an `Unauthorized` error with `message`.
fn unauthorized<S: Into<String>>(message: S) -> RestError {
    RestError::Unauthorized(message.into())
}

/// Validates that the `Authorization` HTTP header is present and well-formed and returns its
/// scheme and payload.
fn get_authorization_header(headers: &HeaderMap) -> RestResult<(&str, &str)> {
    let authz = match get_unique_header(headers, "Authorization") {
        Ok(Some(value)) => value,
        Ok(None) => return Err(unauthorized("Missing Authorization header")),
        Err(e) => return Err(unauthorized(e.to_string())),
    };

    let authz = authz
        .to_str()
        .map_err(|e| unauthorized(format!("Bad encoding in Authorization header: {}", e)))?;

    match authz.split_once(' ') {
        Some((scheme, payload)) if !scheme.is_empty() => Ok((scheme, payload)),
        Some(_) => Err(unauthorized("Bad Authorization header: missing scheme")),
        None => Err(unauthorized("Bad Authorization header: missing payload")),
    }
}

/// Extracts the token from a `Basic` authorization `payload`, where the token takes the place of
/// the username and the password is ignored.
fn get_basic_token(payload: &str) -> RestResult<Token> {
    let payload = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| unauthorized(format!("Bad base64 encoding in payload: {}", e)))?;
    let payload = String::from_utf8(payload)
        .map_err(|e| unauthorized(format!("Bad UTF-8 encoding in payload: {}", e)))?;

    match payload.split_once(':') {
        Some((token, _password)) if !token.is_empty() => Ok(Token::new(token)),
        Some(_) => Err(unauthorized("Missing token")),
        None => Err(unauthorized("Bad content")),
    }
}

/// Extracts the token presented in the `headers`.
///
/// Clients can send the token either as a bearer token or as the username of basic credentials
/// with an empty password.
pub fn get_token_auth(headers: &HeaderMap) -> RestResult<Token> {
    let (scheme, payload) = get_authorization_header(headers)?;
    if scheme.eq_ignore_ascii_case("Basic") {
        get_basic_token(payload)
    } else if scheme.eq_ignore_ascii_case("Bearer") {
        if payload.is_empty() {
            return Err(unauthorized("Missing token"));
        }
        Ok(Token::new(payload))
    } else {
        Err(unauthorized("Unsupported scheme"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    /// Builds a header map with one `Authorization` header per entry in `values`.
    fn authz_headers(values: &[&[u8]]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(http::header::AUTHORIZATION, HeaderValue::from_bytes(value).unwrap());
        }
        headers
    }

    #[test]
    fn test_get_token_auth_basic() {
        let value = format!("Basic {}", general_purpose::STANDARD.encode("the.token:"));
        let headers = authz_headers(&[value.as_bytes()]);
        assert_eq!(Token::new("the.token"), get_token_auth(&headers).unwrap());
    }

    #[test]
    fn test_get_token_auth_basic_ignores_password() {
        let value = format!("Basic {}", general_purpose::STANDARD.encode("the.token:whatever"));
        let headers = authz_headers(&[value.as_bytes()]);
        assert_eq!(Token::new("the.token"), get_token_auth(&headers).unwrap());
    }

    #[test]
    fn test_get_token_auth_bearer() {
        let headers = authz_headers(&[b"Bearer the.token"]);
        assert_eq!(Token::new("the.token"), get_token_auth(&headers).unwrap());
    }

    /// Runs `get_token_auth` with an invalid set of header `values` and ensures that the call
    /// fails with an `Unauthorized` error that contains `exp_error` in the failure message.
    fn do_get_token_auth_error_test(exp_error: &str, values: &[&[u8]]) {
        let headers = authz_headers(values);
        match get_token_auth(&headers) {
            Err(RestError::Unauthorized(message)) => {
                assert!(message.contains(exp_error), "'{}' lacks '{}'", message, exp_error);
            }
            e => panic!("{:?}", e),
        }
    }

    #[test]
    fn test_get_token_auth_errors() {
        do_get_token_auth_error_test("Missing Authorization", &[]);
        do_get_token_auth_error_test("more than one value", &[b"Bearer a", b"Bearer b"]);
        do_get_token_auth_error_test("Bad encoding", &[b"Bearer \xc3\x28"]);
        do_get_token_auth_error_test("missing payload", &[b"Bearer"]);
        do_get_token_auth_error_test("missing scheme", &[b" abc"]);
        do_get_token_auth_error_test("Unsupported scheme", &[b"Digest abc"]);
        do_get_token_auth_error_test("Missing token", &[b"Bearer "]);
        do_get_token_auth_error_test("Bad base64", &[b"Basic !!!"]);
        do_get_token_auth_error_test("Bad UTF-8", &[b"Basic wyg6"]);
        do_get_token_auth_error_test("Bad content", &[b"Basic YWJj"]);
        do_get_token_auth_error_test("Missing token", &[b"Basic OmFiYw=="]);
    }
}
