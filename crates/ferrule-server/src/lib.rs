//! Standalone OAuth 2.0 authorization server.
//!
//! Wires [`ferrule_auth`] to an in-memory token store, clients and users
//! from the configuration file, and an axum router.

pub mod config;
pub mod hooks;
pub mod observability;

use std::sync::Arc;

use axum::{Json, Router, extract::FromRef, routing::get};
use ferrule_auth::{BearerAuth, Manager, MemoryClientStore, OAuthState, Server, oauth_router};
use ferrule_auth_memory::MemoryTokenStore;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use config::AppConfig;

use hooks::{ConfigPasswordAuthorization, HeaderUserAuthorization};

/// Application state for the non-OAuth routes.
#[derive(Clone, Debug)]
pub struct AppState {
    pub oauth: OAuthState,
}

impl FromRef<AppState> for OAuthState {
    fn from_ref(state: &AppState) -> Self {
        state.oauth.clone()
    }
}

/// Builds the authorization server from its configuration.
pub fn build_server(cfg: &AppConfig) -> Server {
    let client_store = Arc::new(MemoryClientStore::with_clients(cfg.clients.iter().cloned()));
    let token_store = Arc::new(MemoryTokenStore::new());
    let manager = Manager::new(cfg.oauth.manager.clone(), client_store, token_store);

    let mut server = Server::new(cfg.oauth.server.clone(), Arc::new(manager));
    if cfg.server.trust_user_header {
        tracing::warn!("Trusting the X-User-Id header for user authorization");
        server = server.with_user_authorization(Arc::new(HeaderUserAuthorization));
    }
    if !cfg.users.is_empty() {
        server = server
            .with_password_authorization(Arc::new(ConfigPasswordAuthorization::new(&cfg.users)));
    }
    server
}

/// Builds the full router: OAuth endpoints, a protected `/api/me` and
/// `/healthz`.
pub fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    cfg.validate()?;

    let mut oauth = OAuthState::new(Arc::new(build_server(cfg)));
    if let Some(login_uri) = &cfg.server.login_uri {
        oauth = oauth.with_login_uri(login_uri);
    }

    tracing::info!(
        clients = cfg.clients.len(),
        users = cfg.users.len(),
        "Authorization server configured"
    );

    let api = Router::new()
        .route("/api/me", get(me))
        .route("/healthz", get(healthz))
        .with_state(AppState {
            oauth: oauth.clone(),
        });

    Ok(Router::new()
        .merge(oauth_router(oauth))
        .merge(api)
        .layer(TraceLayer::new_for_http()))
}

/// Describes the grant behind the presented bearer token.
async fn me(BearerAuth(info): BearerAuth) -> Json<Value> {
    Json(json!({
        "client_id": info.client_id,
        "user_id": info.user_id,
        "scope": info.scope,
        "expires_in": info.access_expires_in_secs(),
    }))
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
