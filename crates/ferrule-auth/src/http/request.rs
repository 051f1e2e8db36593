//! Extracting an [`OAuthRequest`] from an axum request.
//!
//! Query parameters and an `application/x-www-form-urlencoded` body are
//! merged; a body value replaces a query value with the same name.

use std::collections::HashMap;

use axum::{
    Form,
    extract::{FromRequest, Request},
    http::{Method, header::CONTENT_TYPE, request::Parts},
};

use crate::error::AuthError;
use crate::oauth::OAuthRequest;

impl<S> FromRequest<S> for OAuthRequest
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let mut oauth = from_parts(&parts);

        if has_form_body(&parts) {
            let Form(body_params): Form<HashMap<String, String>> =
                Form::from_request(Request::from_parts(parts, body), state)
                    .await
                    .map_err(|e| {
                        AuthError::invalid_request(format!("Failed to parse request body: {}", e))
                    })?;
            oauth.params.extend(body_params);
        }

        Ok(oauth)
    }
}

/// Builds a request from the method, headers and query string.
pub(crate) fn from_parts(parts: &Parts) -> OAuthRequest {
    let params = parts
        .uri
        .query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    OAuthRequest {
        method: parts.method.clone(),
        headers: parts.headers.clone(),
        params,
    }
}

fn has_form_body(parts: &Parts) -> bool {
    if parts.method == Method::GET || parts.method == Method::HEAD {
        return false;
    }
    parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}
