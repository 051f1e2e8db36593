//! Authorization server error types.
//!
//! [`AuthError`] covers both the RFC 6749 wire errors and a set of
//! internal-only variants. The internal variants let the manager report
//! exactly which check failed; the server collapses them into their wire
//! code (usually `invalid_grant`) before anything reaches a client, so the
//! response never reveals why a grant was rejected.

use std::fmt;

/// Shared `error_description` of every rejected grant.
pub const INVALID_GRANT_DESCRIPTION: &str =
    "The provided authorization grant is invalid, expired, revoked, or was issued to another client";

/// Errors that can occur while running the OAuth 2.0 protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The request is missing a parameter or is otherwise malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what is wrong with the request.
        message: String,
    },

    /// The client is unknown or failed authentication.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The authorization grant or refresh token is invalid, expired, or revoked.
    #[error("Invalid grant: {message}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        message: String,
    },

    /// The requested scope is invalid or exceeds what was granted.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// The client is not allowed to use the requested grant or response type.
    #[error("Unauthorized client: {message}")]
    UnauthorizedClient {
        /// Description of why the client is not authorized.
        message: String,
    },

    /// The grant type is not supported by this server.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// The response type is not supported by this server.
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType {
        /// The unsupported response type.
        response_type: String,
    },

    /// The resource owner or the server denied the request.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Description of why access was denied.
        message: String,
    },

    /// The redirect URI is not within the client's registered domain.
    #[error("Invalid redirect uri")]
    InvalidRedirectUri,

    /// The authorization code is unknown, expired, or bound to another client.
    #[error("Invalid authorize code")]
    InvalidAuthorizeCode,

    /// The access token is unknown.
    #[error("Invalid access token")]
    InvalidAccessToken,

    /// The refresh token is unknown or bound to another client.
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// The access token has expired.
    #[error("Expired access token")]
    ExpiredAccessToken,

    /// The refresh token has expired.
    #[error("Expired refresh token")]
    ExpiredRefreshToken,

    /// The code was issued with a PKCE challenge but no verifier was sent,
    /// or a verifier was sent for a code issued without a challenge.
    #[error("Missing code verifier")]
    MissingCodeVerifier,

    /// PKCE is required but the code was issued without a challenge.
    #[error("Missing code challenge")]
    MissingCodeChallenge,

    /// The code verifier does not match the stored challenge.
    #[error("Invalid code challenge")]
    InvalidCodeChallenge,

    /// PKCE is forced and the authorize request carried no `code_challenge`.
    #[error("PKCE is required: code_challenge is missing")]
    CodeChallengeRequired,

    /// The `code_challenge` is not 43 to 128 characters long.
    #[error("Invalid code_challenge length: {length}")]
    InvalidCodeChallengeLength {
        /// The length that was received.
        length: usize,
    },

    /// The `code_challenge_method` is unknown or not allowed.
    #[error("Unsupported code_challenge_method: {method}")]
    UnsupportedCodeChallengeMethod {
        /// The method that was received.
        method: String,
    },

    /// A client or token store operation failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `UnauthorizedClient` error.
    #[must_use]
    pub fn unauthorized_client(message: impl Into<String>) -> Self {
        Self::UnauthorizedClient {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `UnsupportedResponseType` error.
    #[must_use]
    pub fn unsupported_response_type(response_type: impl Into<String>) -> Self {
        Self::UnsupportedResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `AccessDenied` error.
    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedCodeChallengeMethod` error.
    #[must_use]
    pub fn unsupported_code_challenge_method(method: impl Into<String>) -> Self {
        Self::UnsupportedCodeChallengeMethod {
            method: method.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is caused by the request (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Internal { .. })
    }

    /// Returns `true` for variants that must be collapsed into a wire
    /// error before being shown to a client.
    #[must_use]
    pub fn is_internal_only(&self) -> bool {
        matches!(
            self,
            Self::InvalidRedirectUri
                | Self::InvalidAuthorizeCode
                | Self::InvalidAccessToken
                | Self::InvalidRefreshToken
                | Self::ExpiredAccessToken
                | Self::ExpiredRefreshToken
                | Self::MissingCodeVerifier
                | Self::MissingCodeChallenge
                | Self::InvalidCodeChallenge
                | Self::Storage { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this is a token lookup failure.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAccessToken
                | Self::InvalidRefreshToken
                | Self::ExpiredAccessToken
                | Self::ExpiredRefreshToken
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidClient { .. } | Self::InvalidGrant { .. } => ErrorCategory::Authentication,
            Self::InvalidScope { .. }
            | Self::UnauthorizedClient { .. }
            | Self::AccessDenied { .. } => ErrorCategory::Authorization,
            Self::InvalidAuthorizeCode
            | Self::MissingCodeVerifier
            | Self::MissingCodeChallenge
            | Self::InvalidCodeChallenge => ErrorCategory::Authentication,
            Self::InvalidAccessToken
            | Self::InvalidRefreshToken
            | Self::ExpiredAccessToken
            | Self::ExpiredRefreshToken => ErrorCategory::Token,
            Self::InvalidRequest { .. }
            | Self::UnsupportedGrantType { .. }
            | Self::UnsupportedResponseType { .. }
            | Self::InvalidRedirectUri
            | Self::CodeChallengeRequired
            | Self::InvalidCodeChallengeLength { .. }
            | Self::UnsupportedCodeChallengeMethod { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the RFC 6749 error code this error is reported as.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. }
            | Self::InvalidRedirectUri
            | Self::CodeChallengeRequired
            | Self::InvalidCodeChallengeLength { .. }
            | Self::UnsupportedCodeChallengeMethod { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. }
            | Self::InvalidAuthorizeCode
            | Self::MissingCodeVerifier
            | Self::MissingCodeChallenge
            | Self::InvalidCodeChallenge => "invalid_grant",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::UnauthorizedClient { .. } => "unauthorized_client",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::UnsupportedResponseType { .. } => "unsupported_response_type",
            Self::AccessDenied { .. } => "access_denied",
            Self::InvalidAccessToken
            | Self::InvalidRefreshToken
            | Self::ExpiredAccessToken
            | Self::ExpiredRefreshToken => "invalid_token",
            Self::Storage { .. } | Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the human-readable description sent as `error_description`.
    ///
    /// Internal-only variants share the generic description of their wire
    /// code so that the reason for a rejected grant is not disclosed.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::InvalidRequest { message }
            | Self::InvalidClient { message }
            | Self::InvalidGrant { message }
            | Self::InvalidScope { message }
            | Self::UnauthorizedClient { message }
            | Self::AccessDenied { message } => message.clone(),
            Self::UnsupportedGrantType { .. } => {
                "The authorization grant type is not supported by the authorization server"
                    .to_string()
            }
            Self::UnsupportedResponseType { .. } => {
                "The authorization server does not support obtaining an authorization code using this method"
                    .to_string()
            }
            Self::InvalidRedirectUri => {
                "The redirect URI is not registered for this client".to_string()
            }
            Self::CodeChallengeRequired => "PKCE is required. code_challenge is missing".to_string(),
            Self::InvalidCodeChallengeLength { .. } => {
                "Code challenge length must be between 43 and 128 characters long".to_string()
            }
            Self::UnsupportedCodeChallengeMethod { .. } => {
                "Selected code challenge method not supported".to_string()
            }
            Self::InvalidAuthorizeCode
            | Self::MissingCodeVerifier
            | Self::MissingCodeChallenge
            | Self::InvalidCodeChallenge => INVALID_GRANT_DESCRIPTION.to_string(),
            Self::InvalidAccessToken
            | Self::InvalidRefreshToken
            | Self::ExpiredAccessToken
            | Self::ExpiredRefreshToken => {
                "The access token provided is expired, revoked, malformed, or invalid".to_string()
            }
            Self::Storage { .. } | Self::Internal { .. } => {
                "The authorization server encountered an unexpected condition that prevented it from fulfilling the request"
                    .to_string()
            }
        }
    }

    /// Returns the HTTP status code from the fixed error table.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        status_for_code(self.oauth_error_code())
    }
}

/// Looks up the HTTP status for an RFC 6749 error code.
///
/// Unknown codes map to 500.
#[must_use]
pub fn status_for_code(code: &str) -> u16 {
    match code {
        "invalid_request"
        | "invalid_grant"
        | "invalid_scope"
        | "unsupported_grant_type"
        | "unsupported_response_type" => 400,
        "invalid_client" | "invalid_token" => 401,
        "unauthorized_client" | "access_denied" => 403,
        "temporarily_unavailable" => 503,
        _ => 500,
    }
}

/// Categories of authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Client or grant authentication failures.
    Authentication,
    /// Permission and scope checks.
    Authorization,
    /// Token lookup and expiry.
    Token,
    /// Request validation errors.
    Validation,
    /// Store failures.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_client("client not found");
        assert_eq!(err.to_string(), "Invalid client: client not found");

        let err = AuthError::InvalidAuthorizeCode;
        assert_eq!(err.to_string(), "Invalid authorize code");

        let err = AuthError::unsupported_code_challenge_method("S512");
        assert_eq!(err.to_string(), "Unsupported code_challenge_method: S512");
    }

    #[test]
    fn test_internal_variants_collapse_to_invalid_grant() {
        for err in [
            AuthError::InvalidAuthorizeCode,
            AuthError::InvalidCodeChallenge,
            AuthError::MissingCodeChallenge,
            AuthError::MissingCodeVerifier,
        ] {
            assert!(err.is_internal_only());
            assert_eq!(err.oauth_error_code(), "invalid_grant");
            assert_eq!(err.status_code(), 400);
        }

        // All collapsed variants share one description.
        assert_eq!(
            AuthError::InvalidAuthorizeCode.description(),
            AuthError::InvalidCodeChallenge.description()
        );
    }

    #[test]
    fn test_status_table() {
        assert_eq!(AuthError::invalid_request("x").status_code(), 400);
        assert_eq!(AuthError::invalid_client("x").status_code(), 401);
        assert_eq!(AuthError::invalid_grant("x").status_code(), 400);
        assert_eq!(AuthError::invalid_scope("x").status_code(), 400);
        assert_eq!(AuthError::unauthorized_client("x").status_code(), 403);
        assert_eq!(AuthError::unsupported_grant_type("x").status_code(), 400);
        assert_eq!(AuthError::access_denied("x").status_code(), 403);
        assert_eq!(AuthError::ExpiredAccessToken.status_code(), 401);
        assert_eq!(AuthError::storage("db down").status_code(), 500);
        assert_eq!(status_for_code("no_such_code"), 500);
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::invalid_client("test");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert!(!err.is_internal_only());

        let err = AuthError::ExpiredRefreshToken;
        assert!(err.is_token_error());
        assert!(err.is_internal_only());

        let err = AuthError::storage("database down");
        assert!(!err.is_client_error());
        assert!(err.is_server_error());
        assert_eq!(err.oauth_error_code(), "server_error");
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::invalid_client("test").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::access_denied("test").category(),
            ErrorCategory::Authorization
        );
        assert_eq!(AuthError::ExpiredAccessToken.category(), ErrorCategory::Token);
        assert_eq!(
            AuthError::storage("test").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            AuthError::CodeChallengeRequired.category(),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Authentication.to_string(), "authentication");
        assert_eq!(ErrorCategory::Token.to_string(), "token");
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
    }
}
