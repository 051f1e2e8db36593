//! Axum handlers for the OAuth 2.0 endpoints.
//!
//! # Endpoints
//!
//! - `GET|POST /oauth/authorize` - [`authorize_handler`]
//! - `POST /oauth/token` - [`token_handler`] (GET when
//!   `allow_get_access_request` is set)
//!
//! # Example
//!
//! ```ignore
//! use ferrule_auth::http::{OAuthState, oauth_router};
//!
//! let app = Router::new()
//!     .merge(oauth_router(OAuthState::new(server)))
//!     .route("/api/me", get(me));
//! ```

pub mod authorize;
pub mod request;
pub mod token;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::oauth::Server;

pub use authorize::authorize_handler;
pub use token::token_handler;

/// Authorize endpoint path.
pub const AUTHORIZE_PATH: &str = "/oauth/authorize";

/// Token endpoint path.
pub const TOKEN_PATH: &str = "/oauth/token";

/// State shared by the OAuth handlers and the [`BearerAuth`] extractor.
///
/// Embed it in a larger application state and implement `FromRef` to use
/// [`BearerAuth`] on your own routes.
///
/// [`BearerAuth`]: crate::middleware::BearerAuth
#[derive(Clone)]
pub struct OAuthState {
    /// The authorization server.
    pub server: Arc<Server>,

    /// Page to send the user agent to while an authorize request is
    /// pending. Without one, pending requests are answered with
    /// `access_denied`.
    pub login_uri: Option<String>,
}

impl OAuthState {
    /// Creates handler state for a server.
    pub fn new(server: Arc<Server>) -> Self {
        Self {
            server,
            login_uri: None,
        }
    }

    /// Sets the login page for pending authorize requests.
    #[must_use]
    pub fn with_login_uri(mut self, login_uri: impl Into<String>) -> Self {
        self.login_uri = Some(login_uri.into());
        self
    }
}

impl std::fmt::Debug for OAuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthState")
            .field("login_uri", &self.login_uri)
            .finish_non_exhaustive()
    }
}

/// Builds a router serving the authorize and token endpoints.
pub fn oauth_router(state: OAuthState) -> Router {
    Router::new()
        .route(AUTHORIZE_PATH, get(authorize_handler).post(authorize_handler))
        .route(TOKEN_PATH, get(token_handler).post(token_handler))
        .with_state(state)
}
