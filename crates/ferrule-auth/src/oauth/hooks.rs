//! Optional extension points of the [`Server`](super::Server).
//!
//! Each hook is a single-method trait installed as `Option<Arc<dyn _>>`.
//! A server with no hooks installed still handles every grant except the
//! ones that need a resource owner (authorize and password), which are
//! denied.
//!
//! Synchronous hooks are implemented for matching closures.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::request::OAuthRequest;
use crate::oauth::token::{ErrorResponse, TokenGenerateRequest};
use crate::types::{GrantType, TokenInfo};

/// Resolves the user behind an authorize request.
#[async_trait]
pub trait UserAuthorizationHandler: Send + Sync {
    /// Returns the user id, or `None` if the user still has to log in or
    /// consent.
    async fn authorize_user(&self, req: &OAuthRequest) -> AuthResult<Option<String>>;
}

/// Checks resource owner credentials for the password grant.
#[async_trait]
pub trait PasswordAuthorizationHandler: Send + Sync {
    /// Returns the user id, or `None` if the credentials are wrong.
    async fn authorize_password(
        &self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> AuthResult<Option<String>>;
}

/// Per-client grant allow-list.
#[async_trait]
pub trait ClientAuthorizedHandler: Send + Sync {
    /// Returns `true` if the client may use the grant.
    async fn is_client_authorized(
        &self,
        client_id: &str,
        grant_type: GrantType,
    ) -> AuthResult<bool>;
}

/// Per-client scope check, applied on authorize and direct grants.
#[async_trait]
pub trait ClientScopeHandler: Send + Sync {
    /// Returns `true` if the client may obtain `req.scope`.
    async fn is_scope_allowed(&self, req: &TokenGenerateRequest) -> AuthResult<bool>;
}

/// Overrides the scope granted at the authorize endpoint.
#[async_trait]
pub trait AuthorizeScopeHandler: Send + Sync {
    /// Returns the scope to grant, or `None` to keep the requested scope.
    async fn authorize_scope(&self, req: &OAuthRequest) -> AuthResult<Option<String>>;
}

/// Overrides the access token lifetime granted at the authorize endpoint.
#[async_trait]
pub trait AccessTokenExpHandler: Send + Sync {
    /// Returns the lifetime to use, or `None` for the grant default.
    async fn access_token_exp(&self, req: &OAuthRequest) -> AuthResult<Option<Duration>>;
}

/// Decides whether a refresh may request `req.scope`.
///
/// Without this hook the requested scope must be a subset of the scope
/// originally granted.
#[async_trait]
pub trait RefreshingScopeHandler: Send + Sync {
    /// Returns `true` if the new scope is acceptable.
    async fn is_refresh_scope_allowed(
        &self,
        req: &TokenGenerateRequest,
        old_scope: &str,
    ) -> AuthResult<bool>;
}

/// Last check on a refresh token before it is exchanged.
#[async_trait]
pub trait RefreshingValidationHandler: Send + Sync {
    /// Returns `true` if the refresh may proceed.
    async fn validate_refreshing(&self, info: &TokenInfo) -> AuthResult<bool>;
}

/// Adds fields to token responses. Reserved fields are never overwritten.
pub trait ExtensionFieldsHandler: Send + Sync {
    /// Returns extra response fields.
    fn extension_fields(&self, info: &TokenInfo) -> Map<String, Value>;
}

impl<F> ExtensionFieldsHandler for F
where
    F: Fn(&TokenInfo) -> Map<String, Value> + Send + Sync,
{
    fn extension_fields(&self, info: &TokenInfo) -> Map<String, Value> {
        self(info)
    }
}

/// Maps server-side errors to a response. Returning `None` yields a generic
/// `server_error`.
pub trait InternalErrorHandler: Send + Sync {
    /// Builds the response for an internal error.
    fn handle_internal_error(&self, err: &AuthError) -> Option<ErrorResponse>;
}

impl<F> InternalErrorHandler for F
where
    F: Fn(&AuthError) -> Option<ErrorResponse> + Send + Sync,
{
    fn handle_internal_error(&self, err: &AuthError) -> Option<ErrorResponse> {
        self(err)
    }
}

/// Observes every error response before it is sent.
pub trait ResponseErrorHandler: Send + Sync {
    /// Called with the final response.
    fn handle_response_error(&self, response: &ErrorResponse);
}

impl<F> ResponseErrorHandler for F
where
    F: Fn(&ErrorResponse) + Send + Sync,
{
    fn handle_response_error(&self, response: &ErrorResponse) {
        self(response);
    }
}
