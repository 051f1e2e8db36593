//! Token endpoint handler.
//!
//! # Request
//!
//! ```text
//! POST /oauth/token
//! Content-Type: application/x-www-form-urlencoded
//! Authorization: Basic <base64(client_id:client_secret)>
//!
//! grant_type=authorization_code
//! &code=SplxlOBeZQQYbYS6WxSbIA
//! &redirect_uri=https://app.example.com/callback
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! ```

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::OAuthState;
use crate::middleware::error::no_store_headers;
use crate::oauth::OAuthRequest;

/// Handles `POST /oauth/token`.
///
/// Success and error responses are both JSON and never cached.
pub async fn token_handler(State(state): State<OAuthState>, req: OAuthRequest) -> Response {
    match state.server.handle_token_request(&req).await {
        Ok(data) => (StatusCode::OK, no_store_headers(), Json(Value::Object(data))).into_response(),
        Err(error) => error.into_response(),
    }
}
