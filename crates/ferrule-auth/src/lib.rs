//! # ferrule-auth
//!
//! Embeddable OAuth 2.0 authorization server.
//!
//! This crate provides:
//! - Authorization code (with PKCE), implicit, password, client credentials
//!   and refresh token grants (RFC 6749, RFC 7636)
//! - A token lifecycle manager over pluggable client and token stores
//! - Request validation and RFC-shaped responses, with optional hooks
//! - Axum handlers and a bearer token extractor
//!
//! ## Overview
//!
//! The [`Manager`](oauth::Manager) owns the token state machine and is the
//! only component that writes to the [`TokenStore`]. The
//! [`Server`](oauth::Server) sits in front of it, turns requests into
//! manager calls and maps results and errors onto the wire format.
//! Persistence is injected through the [`storage`] traits.
//!
//! ## Modules
//!
//! - [`config`] - Token lifetimes and request handling policy
//! - [`error`] - Error taxonomy and its wire mapping
//! - [`types`] - Clients and token records
//! - [`token`] - Code and token value generators
//! - [`storage`] - Client and token store traits
//! - [`oauth`] - Manager, server, hooks and PKCE
//! - [`http`] - Axum handlers for the authorize and token endpoints
//! - [`middleware`] - Bearer token extractor and error responses

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{ConfigError, ManagerConfig, OAuthConfig, ServerConfig};
pub use error::{AuthError, ErrorCategory};
pub use http::{OAuthState, authorize_handler, oauth_router, token_handler};
pub use middleware::BearerAuth;
pub use oauth::{AuthorizeOutcome, ErrorResponse, Manager, OAuthRequest, Server};
pub use storage::{ClientStore, MemoryClientStore, TokenStore};
pub use types::{Client, GrantType, IssuedToken, ResponseType, TokenInfo};

/// Type alias for authorization server results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use ferrule_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{
        ClientCredentialsSource, ConfigError, GrantConfig, ManagerConfig, OAuthConfig,
        RefreshConfig, ServerConfig,
    };
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{OAuthState, authorize_handler, oauth_router, token_handler};
    pub use crate::middleware::BearerAuth;
    pub use crate::oauth::{
        AccessTokenExpHandler, AuthorizeOutcome, AuthorizeRequest, AuthorizeScopeHandler,
        ClientAuthorizedHandler, ClientScopeHandler, ClientSecretVerifier, CodeChallengeMethod,
        DomainRedirectValidator, ErrorResponse, ExtensionFieldsHandler, InternalErrorHandler,
        Manager, OAuthRequest, PasswordAuthorizationHandler, PlainSecretVerifier,
        RedirectUriValidator, RefreshingScopeHandler, RefreshingValidationHandler,
        ResponseErrorHandler, Server, TokenGenerateRequest, UserAuthorizationHandler,
    };
    pub use crate::storage::{ClientStore, MemoryClientStore, TokenStore};
    pub use crate::token::{
        AccessGenerate, AccessGenerator, AuthorizeGenerate, AuthorizeGenerator, GenerateBasic,
        HmacAlgorithm, JwtAccessGenerate,
    };
    pub use crate::types::{Client, GrantType, IssuedToken, ResponseType, TokenInfo};
}
