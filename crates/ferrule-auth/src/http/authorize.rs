//! Authorize endpoint handler.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::debug;

use super::{AUTHORIZE_PATH, OAuthState};
use crate::error::AuthError;
use crate::middleware::error::no_store_headers;
use crate::oauth::{AuthorizeOutcome, OAuthRequest};

/// Handles `GET|POST /oauth/authorize`.
///
/// - Redirect: `302 Found` with the code or token in the `Location` URL
/// - Out-of-band client: `200` with the response data as JSON
/// - User not yet authorized: `302` to the login page, or `403 access_denied`
///   when none is configured
/// - Request the client cannot be trusted with: the JSON error response
pub async fn authorize_handler(State(state): State<OAuthState>, req: OAuthRequest) -> Response {
    match state.server.handle_authorize_request(&req).await {
        Ok(AuthorizeOutcome::Redirect(url)) => found(url),
        Ok(AuthorizeOutcome::OutOfBand(data)) => {
            (StatusCode::OK, no_store_headers(), Json(Value::Object(data))).into_response()
        }
        Ok(AuthorizeOutcome::Pending) => match state.login_uri.as_deref() {
            Some(login_uri) => {
                debug!(login_uri, "Sending user agent to login");
                found(login_redirect(login_uri, &req))
            }
            None => AuthError::access_denied("User authorization is required").into_response(),
        },
        Err(error) => error.into_response(),
    }
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Login URL carrying the original authorize request in `return_to`.
fn login_redirect(login_uri: &str, req: &OAuthRequest) -> String {
    let mut params: Vec<(&String, &String)> = req.params.iter().collect();
    params.sort();

    let original = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let return_to = format!("{}?{}", AUTHORIZE_PATH, original);
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("return_to", &return_to)
        .finish();

    let separator = if login_uri.contains('?') { '&' } else { '?' };
    format!("{}{}{}", login_uri, separator, query)
}
