//! Authorization endpoint types.
//!
//! # Authorization Request
//!
//! ```text
//! GET /oauth/authorize?
//!   response_type=code
//!   &client_id=my-app
//!   &redirect_uri=https://app.example.com/callback
//!   &scope=read write
//!   &state=abc123xyz
//!   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
//!   &code_challenge_method=S256
//! ```
//!
//! # Responses
//!
//! The code flow puts its result in the redirect query string. The implicit
//! flow puts it in the fragment, so the access token never reaches a server
//! log or a `Referer` header.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::pkce::CodeChallengeMethod;
use crate::types::ResponseType;

/// Redirect URI of clients without a web endpoint. The code is returned to
/// the embedding application for display instead of being redirected.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// A validated authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    /// Requested response type.
    pub response_type: ResponseType,

    /// Requesting client.
    pub client_id: String,

    /// Redirect URI. `None` means the client's registered domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Requested scope.
    #[serde(default)]
    pub scope: String,

    /// Opaque client state echoed back on redirect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Resource owner, set once the user has been authorized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// PKCE challenge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE challenge method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<CodeChallengeMethod>,

    /// Access token lifetime override.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde::option"
    )]
    pub access_token_exp: Option<Duration>,
}

impl AuthorizeRequest {
    /// Creates a request with only the required fields set.
    #[must_use]
    pub fn new(response_type: ResponseType, client_id: impl Into<String>) -> Self {
        Self {
            response_type,
            client_id: client_id.into(),
            redirect_uri: None,
            scope: String::new(),
            state: None,
            user_id: None,
            code_challenge: None,
            code_challenge_method: None,
            access_token_exp: None,
        }
    }
}

/// Result of handling an authorization request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizeOutcome {
    /// The user has not authorized the request yet. The caller renders its
    /// own login or consent page.
    Pending,

    /// The client uses the out-of-band redirect URI. The data (`code`, or the
    /// token fields for the implicit flow) is shown to the user directly.
    OutOfBand(Map<String, Value>),

    /// Redirect the user agent to this URL with `302 Found`.
    Redirect(String),
}

/// Builds the redirect URL carrying `params` and `state`.
///
/// Code responses and their errors go in the query string; token responses
/// go in the fragment.
///
/// # Errors
///
/// Returns `AuthError::InvalidRedirectUri` if `redirect_uri` is not an
/// absolute URL.
pub fn build_redirect_url<'a>(
    redirect_uri: &str,
    response_type: ResponseType,
    state: Option<&str>,
    params: impl IntoIterator<Item = (&'a str, String)>,
) -> AuthResult<String> {
    let mut url = Url::parse(redirect_uri).map_err(|_| AuthError::InvalidRedirectUri)?;

    let params = params
        .into_iter()
        .chain(state.map(|s| ("state", s.to_string())));

    match response_type {
        ResponseType::Code => {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, &value);
            }
        }
        ResponseType::Token => {
            let mut fragment = url::form_urlencoded::Serializer::new(String::new());
            for (name, value) in params {
                fragment.append_pair(name, &value);
            }
            url.set_fragment(Some(&fragment.finish()));
        }
    }

    Ok(url.to_string())
}

/// Flattens response data into redirect parameters.
///
/// Strings are used as-is; other JSON values use their JSON text.
#[must_use]
pub fn data_to_params(data: &Map<String, Value>) -> Vec<(&str, String)> {
    data.iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.as_str(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_code_redirect_uses_query() {
        let url = build_redirect_url(
            "https://app.example.com/cb",
            ResponseType::Code,
            Some("xyz"),
            [("code", "ABC".to_string())],
        )
        .unwrap();
        assert_eq!(url, "https://app.example.com/cb?code=ABC&state=xyz");
    }

    #[test]
    fn test_code_redirect_keeps_existing_query() {
        let url = build_redirect_url(
            "https://app.example.com/cb?tenant=1",
            ResponseType::Code,
            None,
            [("code", "ABC".to_string())],
        )
        .unwrap();
        assert_eq!(url, "https://app.example.com/cb?tenant=1&code=ABC");
    }

    #[test]
    fn test_token_redirect_uses_fragment() {
        let data = json!({
            "access_token": "AT",
            "expires_in": 3600,
            "token_type": "Bearer"
        });
        let data = data.as_object().unwrap();
        let url = build_redirect_url(
            "https://app.example.com/cb",
            ResponseType::Token,
            Some("s 1"),
            data_to_params(data),
        )
        .unwrap();

        let parsed = Url::parse(&url).unwrap();
        assert_eq!(parsed.query(), None);
        let fragment: Vec<(String, String)> =
            url::form_urlencoded::parse(parsed.fragment().unwrap().as_bytes())
                .into_owned()
                .collect();
        assert!(fragment.contains(&("access_token".into(), "AT".into())));
        assert!(fragment.contains(&("expires_in".into(), "3600".into())));
        assert!(fragment.contains(&("state".into(), "s 1".into())));
    }

    #[test]
    fn test_relative_redirect_is_rejected() {
        let err = build_redirect_url("/cb", ResponseType::Code, None, Vec::new()).unwrap_err();
        assert_eq!(err, AuthError::InvalidRedirectUri);
    }
}
