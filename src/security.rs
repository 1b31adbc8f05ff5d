// Access gate
//
// The gate is chosen once at startup: without an API key every request is
// admitted, with one the request must carry `Authorization: Bearer <key>`.
// Every rejection maps to the same 403 response so callers cannot tell
// which check failed.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;
use thiserror::Error;

use crate::models::ErrorResponse;

/// Authentication scheme accepted by the gate
pub const BEARER_SCHEME: &str = "Bearer";

/// Shared secret presented by clients
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Compare without short-circuiting on the first differing byte
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();
        if expected.len() != candidate.len() {
            return false;
        }
        expected
            .iter()
            .zip(candidate)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Reasons a request is refused
///
/// All variants produce the same HTTP response; the distinction only shows
/// up in server logs.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing or malformed authorization header")]
    MissingCredentials,

    #[error("invalid authentication scheme")]
    InvalidScheme,

    #[error("invalid credentials")]
    InvalidCredentials,
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::FORBIDDEN
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Forbidden().json(ErrorResponse {
            error: "Forbidden".to_string(),
            status: None,
        })
    }
}

/// Scheme and credential parsed from an `Authorization` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub scheme: &'a str,
    pub credentials: &'a str,
}

impl<'a> Credentials<'a> {
    /// Split a header value at the first space; `None` if either part is empty
    pub fn parse(header: &'a str) -> Option<Self> {
        let (scheme, credentials) = header.trim().split_once(' ')?;
        let credentials = credentials.trim();
        if scheme.is_empty() || credentials.is_empty() {
            return None;
        }
        Some(Self {
            scheme,
            credentials,
        })
    }
}

/// Request admission policy, fixed for the life of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessGate {
    /// No key configured, everything is admitted
    Open,
    /// Requests must present this key as a bearer token
    Bearer(ApiKey),
}

impl AccessGate {
    /// Build the gate from the configured key; only an unset or empty key
    /// disables it
    pub fn from_api_key(api_key: Option<String>) -> Self {
        match api_key {
            Some(key) if !key.is_empty() => Self::Bearer(ApiKey::new(key)),
            _ => Self::Open,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Bearer(_))
    }

    /// Decide whether a request with this `Authorization` value is admitted
    ///
    /// Returns the presented credential when a key is enforced.
    pub fn check(&self, authorization: Option<&str>) -> Result<Option<String>, AuthError> {
        let key = match self {
            Self::Open => return Ok(None),
            Self::Bearer(key) => key,
        };

        let credentials = authorization
            .and_then(Credentials::parse)
            .ok_or(AuthError::MissingCredentials)?;

        if credentials.scheme != BEARER_SCHEME {
            return Err(AuthError::InvalidScheme);
        }
        if !key.matches(credentials.credentials) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Some(credentials.credentials.to_string()))
    }
}
