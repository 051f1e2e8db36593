//! OAuth 2.0 protocol implementation.
//!
//! # Layers
//!
//! - [`manager`] - token lifecycle state machine, the only writer of token
//!   state
//! - [`server`] - request validation, hooks and response shaping
//! - [`hooks`] - optional extension points of the server
//!
//! # Supporting Types
//!
//! - [`authorize`] - authorize request, outcome and redirect building
//! - [`token`] - token generation request and error response
//! - [`request`] - framework-neutral request view
//! - [`client_auth`] - redirect URI and client secret checks
//! - [`pkce`] - PKCE challenge methods (RFC 7636)
//!
//! # Example
//!
//! ```ignore
//! use ferrule_auth::oauth::{Manager, Server};
//!
//! let manager = Manager::new(config.manager, client_store, token_store);
//! let server = Server::new(config.server, Arc::new(manager))
//!     .with_user_authorization(Arc::new(SessionUser));
//!
//! let data = server.handle_token_request(&req).await?;
//! ```

pub mod authorize;
pub mod client_auth;
pub mod hooks;
pub mod manager;
pub mod pkce;
pub mod request;
pub mod server;
pub mod token;

pub use authorize::{AuthorizeOutcome, AuthorizeRequest, OOB_REDIRECT_URI, build_redirect_url};
pub use client_auth::{
    ClientSecretVerifier, DomainRedirectValidator, PlainSecretVerifier, RedirectUriValidator,
};
pub use hooks::{
    AccessTokenExpHandler, AuthorizeScopeHandler, ClientAuthorizedHandler, ClientScopeHandler,
    ExtensionFieldsHandler, InternalErrorHandler, PasswordAuthorizationHandler,
    RefreshingScopeHandler, RefreshingValidationHandler, ResponseErrorHandler,
    UserAuthorizationHandler,
};
pub use manager::Manager;
pub use pkce::CodeChallengeMethod;
pub use request::{OAuthRequest, parse_basic_auth};
pub use server::Server;
pub use token::{ErrorResponse, TokenGenerateRequest};
