//! Bearer token extractor.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::error::AuthError;
use crate::http::OAuthState;
use crate::http::request::from_parts;
use crate::types::TokenInfo;

/// Axum extractor yielding the [`TokenInfo`] of a valid bearer token.
///
/// The token is read from the `Authorization: Bearer` header, else from the
/// `access_token` query parameter.
///
/// # Errors
///
/// Rejects with `invalid_token` (401) if the token is missing, unknown or
/// expired.
///
/// # Example
///
/// ```ignore
/// async fn handler(BearerAuth(info): BearerAuth) -> impl IntoResponse {
///     Json(json!({ "client_id": info.client_id, "scope": info.scope }))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BearerAuth(pub TokenInfo);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    OAuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = OAuthState::from_ref(state);
        let req = from_parts(parts);

        let info = state
            .server
            .validation_bearer_token(&req)
            .await
            .inspect_err(|e| {
                tracing::debug!(path = %parts.uri.path(), error = %e, "Bearer token rejected");
            })?;

        Ok(BearerAuth(info))
    }
}
