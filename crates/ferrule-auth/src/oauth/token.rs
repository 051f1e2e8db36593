//! Token endpoint types.
//!
//! # Token Response
//!
//! ```json
//! {
//!   "access_token": "YMVHNGEZNTQTZJQ0ZI0ZNZQ4LWE0MJKTMDQXMDIWZDQ1NJK2",
//!   "token_type": "Bearer",
//!   "expires_in": 7200,
//!   "scope": "read",
//!   "refresh_token": "ODBJMJRJNGYTMDE0ZC01YJE0LWI0NMETZMQXZTHKMDU2ZTYW"
//! }
//! ```
//!
//! # Error Response
//!
//! ```json
//! {
//!   "error": "invalid_grant",
//!   "error_description": "The provided authorization grant is invalid, expired, revoked, or was issued to another client"
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::oauth::pkce::CodeChallengeMethod;

/// Parameters for issuing a code or a token.
///
/// Built by the server from a validated request and passed to the
/// [`Manager`](super::Manager).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenGenerateRequest {
    /// Requesting client.
    pub client_id: String,

    /// Secret presented by the client.
    pub client_secret: Option<String>,

    /// Resource owner.
    pub user_id: Option<String>,

    /// Redirect URI presented with the request.
    pub redirect_uri: Option<String>,

    /// Requested scope.
    pub scope: String,

    /// Authorization code being exchanged.
    pub code: Option<String>,

    /// PKCE challenge to store with a new code.
    pub code_challenge: Option<String>,

    /// Method of `code_challenge`.
    pub code_challenge_method: Option<CodeChallengeMethod>,

    /// PKCE verifier presented at the token endpoint.
    pub code_verifier: Option<String>,

    /// Refresh token being exchanged.
    pub refresh: Option<String>,

    /// Access token lifetime override.
    pub access_token_exp: Option<Duration>,
}

impl TokenGenerateRequest {
    /// Creates a request for a client.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the resource owner.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the authorization code to exchange.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the PKCE challenge for a new code.
    #[must_use]
    pub fn with_code_challenge(
        mut self,
        challenge: impl Into<String>,
        method: CodeChallengeMethod,
    ) -> Self {
        self.code_challenge = Some(challenge.into());
        self.code_challenge_method = Some(method);
        self
    }

    /// Sets the PKCE verifier.
    #[must_use]
    pub fn with_code_verifier(mut self, verifier: impl Into<String>) -> Self {
        self.code_verifier = Some(verifier.into());
        self
    }

    /// Sets the refresh token to exchange.
    #[must_use]
    pub fn with_refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
        self
    }

    /// Overrides the access token lifetime.
    #[must_use]
    pub fn with_access_token_exp(mut self, exp: Duration) -> Self {
        self.access_token_exp = Some(exp);
        self
    }
}

/// OAuth 2.0 error response body plus its HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// RFC 6749 error code.
    pub error: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Application-specific numeric code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,

    /// Page describing the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,

    /// HTTP status. Not part of the body.
    #[serde(skip, default = "default_status")]
    pub status_code: u16,
}

fn default_status() -> u16 {
    500
}

impl ErrorResponse {
    /// Creates a response for an RFC 6749 error code with its table status.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        let error = error.into();
        let status_code = crate::error::status_for_code(&error);
        Self {
            error,
            error_description: None,
            error_code: None,
            error_uri: None,
            status_code,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    /// Sets the numeric error code.
    #[must_use]
    pub fn with_error_code(mut self, code: i64) -> Self {
        self.error_code = Some(code);
        self
    }

    /// Sets the error URI.
    #[must_use]
    pub fn with_error_uri(mut self, uri: impl Into<String>) -> Self {
        self.error_uri = Some(uri.into());
        self
    }

    /// Overrides the HTTP status.
    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Redirect parameters for this error.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("error", self.error.clone())];
        if let Some(description) = &self.error_description {
            params.push(("error_description", description.clone()));
        }
        if let Some(code) = self.error_code {
            params.push(("error_code", code.to_string()));
        }
        if let Some(uri) = &self.error_uri {
            params.push(("error_uri", uri.clone()));
        }
        params
    }
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        Self::new(err.oauth_error_code()).with_description(err.description())
    }
}
