//! Error responses.
//!
//! Both [`ErrorResponse`] and [`AuthError`] render the RFC 6749 JSON error
//! body. Error responses are never cached, and 401 responses carry a
//! `WWW-Authenticate` challenge.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::oauth::token::ErrorResponse;

// =============================================================================
// IntoResponse Implementations
// =============================================================================

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut headers = no_store_headers();
        if status == StatusCode::UNAUTHORIZED {
            let challenge =
                build_www_authenticate_header(&self.error, self.error_description.as_deref());
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(self)).into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Request failed");
        }
        ErrorResponse::from(&self).into_response()
    }
}

/// `Cache-Control: no-store` and `Pragma: no-cache`.
#[must_use]
pub fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Builds the `WWW-Authenticate` value for a 401.
///
/// Client authentication failures challenge for Basic credentials, token
/// failures for a Bearer token.
fn build_www_authenticate_header(error: &str, description: Option<&str>) -> String {
    let scheme = if error == "invalid_client" {
        "Basic"
    } else {
        "Bearer"
    };
    match description {
        Some(description) => format!(
            "{} realm=\"ferrule\", error=\"{}\", error_description=\"{}\"",
            scheme,
            error,
            description.replace('"', "\\\"")
        ),
        None => format!("{} realm=\"ferrule\", error=\"{}\"", scheme, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_invalid_grant_response() {
        let response = AuthError::InvalidAuthorizeCode.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let headers = response.headers();
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
        assert_eq!(headers.get(header::PRAGMA).unwrap(), "no-cache");
        assert!(!headers.contains_key(header::WWW_AUTHENTICATE));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "invalid_grant");
        assert!(json["error_description"].is_string());
    }

    #[tokio::test]
    async fn test_expired_token_challenge() {
        let response = AuthError::ExpiredAccessToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(challenge.starts_with("Bearer"));
        assert!(challenge.contains("error=\"invalid_token\""));
    }

    #[tokio::test]
    async fn test_invalid_client_challenge() {
        let response = AuthError::invalid_client("Client authentication failed").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(challenge.starts_with("Basic realm=\"ferrule\""));
    }

    #[tokio::test]
    async fn test_custom_status_and_fields() {
        let response = ErrorResponse::new("temporarily_unavailable")
            .with_error_code(7)
            .with_error_uri("https://docs.example.com/errors/7")
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error_code"], 7);
        assert_eq!(json["error_uri"], "https://docs.example.com/errors/7");
    }

    #[test]
    fn test_www_authenticate_escapes_quotes() {
        let value = build_www_authenticate_header("invalid_token", Some("bad \"token\""));
        assert!(value.contains("bad \\\"token\\\""));
    }
}
