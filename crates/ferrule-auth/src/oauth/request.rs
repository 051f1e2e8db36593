//! Framework-neutral view of an incoming OAuth request.
//!
//! The [`Server`](super::Server) works on [`OAuthRequest`] rather than on a
//! concrete axum request. The HTTP layer builds one from the query string,
//! the urlencoded body and the headers.

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, header::AUTHORIZATION};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Method, headers and merged form parameters of one request.
#[derive(Debug, Clone, Default)]
pub struct OAuthRequest {
    /// HTTP method.
    pub method: Method,

    /// Request headers.
    pub headers: HeaderMap,

    /// Query and body parameters; body values win on conflict.
    pub params: HashMap<String, String>,
}

impl OAuthRequest {
    /// Creates an empty request with the given method.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns a parameter value. Empty values are treated as absent.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Returns an owned parameter value.
    #[must_use]
    pub fn param_owned(&self, name: &str) -> Option<String> {
        self.param(name).map(str::to_string)
    }

    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())
    }

    /// Parses HTTP Basic credentials from the `Authorization` header.
    #[must_use]
    pub fn basic_auth(&self) -> Option<(String, String)> {
        self.authorization().and_then(parse_basic_auth)
    }

    /// Returns the bearer token from the `Authorization` header, else from
    /// the `access_token` parameter.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        match self.authorization().and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) if !token.is_empty() => Some(token),
            _ => self.param("access_token"),
        }
    }
}

/// Parses an HTTP Basic `Authorization` header value.
///
/// Returns `(client_id, client_secret)`.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Split on first colon (secret may contain colons)
    let (client_id, client_secret) = credentials.split_once(':')?;

    Some((client_id.to_string(), client_secret.to_string()))
}
