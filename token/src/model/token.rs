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

//! Compact signed tokens.
//!
//! A token is made of three base64url-encoded sections separated by dots: a fixed header, the
//! claims, and an HMAC-SHA256 signature computed over the first two sections exactly as
//! transmitted.  The claims always include the `iat` and `exp` Unix timestamps in seconds.

use crate::model::UserSecret;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// The only header we ever produce or accept.
const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Name of the claim that holds the issue time.
const ISSUED_AT_CLAIM: &str = "iat";

/// Name of the claim that holds the expiration time.
const EXPIRES_CLAIM: &str = "exp";

/// Errors detected while validating a token.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TokenError {
    /// The token does not have the expected structure.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The signature does not match the contents of the token.
    #[error("Invalid token signature")]
    BadSignature,

    /// The token is past its expiration time.
    #[error("Token has expired")]
    Expired,
}

/// Result type for this module.
pub type TokenResult<T> = Result<T, TokenError>;

/// An opaque type holding a token as transmitted over the wire.
#[derive(Clone, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wraps a token received from a client.  Tokens are only validated by `Signer::verify`.
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    /// Returns the string representation of the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed token")
    }
}

/// Splits a `token` into its three encoded sections.
fn split(token: &Token) -> TokenResult<(&str, &str, &str)> {
    let mut parts = token.as_str().split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(claims), Some(signature), None) => Ok((header, claims, signature)),
        _ => Err(TokenError::Malformed("Expected three sections".to_owned())),
    }
}

/// Decodes one base64url `section` of a token.
///
/// The engine refuses padding and non-zero trailing bits, so every byte sequence has exactly one
/// accepted encoding.
fn decode_section(section: &str) -> TokenResult<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(section).map_err(|e| TokenError::Malformed(e.to_string()))
}

/// Decodes the encoded `claims` section of a token.
fn decode_claims(claims: &str) -> TokenResult<Map<String, Value>> {
    let raw = decode_section(claims)?;
    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(TokenError::Malformed("Claims must be a JSON object".to_owned())),
        Err(e) => Err(TokenError::Malformed(e.to_string())),
    }
}

/// Extracts the claims of a `token` without verifying it.
///
/// This exists so that callers can locate the secret needed to verify the token.  Nothing in the
/// returned claims can be trusted until `Signer::verify` succeeds.
pub fn peek(token: &Token) -> TokenResult<Map<String, Value>> {
    let (_header, claims, _signature) = split(token)?;
    decode_claims(claims)
}

/// Mints and verifies tokens keyed by a global secret combined with a per-user secret.
#[derive(Clone)]
pub struct Signer {
    /// The global part of the signing key.
    key: Vec<u8>,
}

impl Signer {
    /// Creates a new signer with the global `key`.
    pub fn new<K: Into<Vec<u8>>>(key: K) -> Self {
        Self { key: key.into() }
    }

    /// Creates the MAC to sign tokens of the user that owns `secret`.
    fn mac(&self, secret: &UserSecret) -> Hmac<Sha256> {
        let mut key = Vec::with_capacity(self.key.len() + secret.as_str().len());
        key.extend_from_slice(&self.key);
        key.extend_from_slice(secret.as_str().as_bytes());
        Hmac::<Sha256>::new_from_slice(&key).expect("HMAC accepts keys of any length")
    }

    /// Creates a token carrying `payload` that expires `ttl` after `now`.
    ///
    /// The `iat` and `exp` claims are computed here and override any same-named keys in `payload`.
    pub fn mint(
        &self,
        secret: &UserSecret,
        payload: Map<String, Value>,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Token {
        let iat = now.unix_timestamp();
        let exp = iat.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));

        let mut claims = Map::with_capacity(payload.len() + 2);
        claims.insert(ISSUED_AT_CLAIM.to_owned(), Value::from(iat));
        claims.insert(EXPIRES_CLAIM.to_owned(), Value::from(exp));
        for (key, value) in payload {
            if key != ISSUED_AT_CLAIM && key != EXPIRES_CLAIM {
                claims.insert(key, value);
            }
        }

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(Value::Object(claims).to_string())
        );
        let mut mac = self.mac(secret);
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Token(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Validates `token` against the user `secret` at time `now` and returns its claims.
    pub fn verify(
        &self,
        secret: &UserSecret,
        token: &Token,
        now: OffsetDateTime,
    ) -> TokenResult<Map<String, Value>> {
        let (header, claims, signature) = split(token)?;

        if decode_section(header)? != HEADER.as_bytes() {
            return Err(TokenError::Malformed("Unsupported header".to_owned()));
        }
        let signature = decode_section(signature)?;

        let mut mac = self.mac(secret);
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(claims.as_bytes());
        mac.verify_slice(&signature).map_err(|_| TokenError::BadSignature)?;

        let claims = decode_claims(claims)?;
        let exp = match claims.get(EXPIRES_CLAIM).and_then(Value::as_i64) {
            Some(exp) => exp,
            None => return Err(TokenError::Malformed("Missing expiration time".to_owned())),
        };
        if now.unix_timestamp() >= exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed signer")
    }
}
