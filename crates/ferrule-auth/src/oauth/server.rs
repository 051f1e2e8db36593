//! Authorization server request handling.
//!
//! The [`Server`] validates incoming authorize and token requests, runs the
//! installed hooks, delegates to the [`Manager`] and shapes the result into
//! RFC 6749 response data. It works on [`OAuthRequest`] so that it can be
//! driven without an HTTP stack; see [`crate::http`] for the axum handlers.

use std::sync::Arc;

use axum::http::Method;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::AuthResult;
use crate::config::{ClientCredentialsSource, ServerConfig};
use crate::error::{AuthError, INVALID_GRANT_DESCRIPTION};
use crate::oauth::authorize::{
    AuthorizeOutcome, AuthorizeRequest, OOB_REDIRECT_URI, build_redirect_url, data_to_params,
};
use crate::oauth::hooks::{
    AccessTokenExpHandler, AuthorizeScopeHandler, ClientAuthorizedHandler, ClientScopeHandler,
    ExtensionFieldsHandler, InternalErrorHandler, PasswordAuthorizationHandler,
    RefreshingScopeHandler, RefreshingValidationHandler, ResponseErrorHandler,
    UserAuthorizationHandler,
};
use crate::oauth::manager::Manager;
use crate::oauth::pkce::{CodeChallengeMethod, validate_challenge_length};
use crate::oauth::request::OAuthRequest;
use crate::oauth::token::{ErrorResponse, TokenGenerateRequest};
use crate::types::{GrantType, ResponseType, TokenInfo};

/// Response fields a token hook can never overwrite.
const RESERVED_TOKEN_FIELDS: [&str; 5] = [
    "access_token",
    "token_type",
    "expires_in",
    "scope",
    "refresh_token",
];

/// OAuth 2.0 authorization server.
///
/// Configure once at startup and share behind an `Arc`.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(config.server, Arc::new(manager))
///     .with_user_authorization(Arc::new(SessionUser))
///     .with_password_authorization(Arc::new(Directory::default()));
///
/// match server.handle_authorize_request(&req).await {
///     Ok(AuthorizeOutcome::Redirect(url)) => { /* 302 */ }
///     Ok(AuthorizeOutcome::Pending) => { /* render login */ }
///     Ok(AuthorizeOutcome::OutOfBand(data)) => { /* show code */ }
///     Err(error) => { /* JSON error */ }
/// }
/// ```
pub struct Server {
    config: ServerConfig,
    manager: Arc<Manager>,
    user_authorization: Option<Arc<dyn UserAuthorizationHandler>>,
    password_authorization: Option<Arc<dyn PasswordAuthorizationHandler>>,
    client_authorized: Option<Arc<dyn ClientAuthorizedHandler>>,
    client_scope: Option<Arc<dyn ClientScopeHandler>>,
    authorize_scope: Option<Arc<dyn AuthorizeScopeHandler>>,
    access_token_exp: Option<Arc<dyn AccessTokenExpHandler>>,
    refreshing_scope: Option<Arc<dyn RefreshingScopeHandler>>,
    refreshing_validation: Option<Arc<dyn RefreshingValidationHandler>>,
    extension_fields: Option<Arc<dyn ExtensionFieldsHandler>>,
    internal_error: Option<Arc<dyn InternalErrorHandler>>,
    response_error: Option<Arc<dyn ResponseErrorHandler>>,
}

impl Server {
    /// Creates a server with no hooks installed.
    pub fn new(config: ServerConfig, manager: Arc<Manager>) -> Self {
        Self {
            config,
            manager,
            user_authorization: None,
            password_authorization: None,
            client_authorized: None,
            client_scope: None,
            authorize_scope: None,
            access_token_exp: None,
            refreshing_scope: None,
            refreshing_validation: None,
            extension_fields: None,
            internal_error: None,
            response_error: None,
        }
    }

    /// Installs the hook resolving the user of an authorize request.
    #[must_use]
    pub fn with_user_authorization(mut self, handler: Arc<dyn UserAuthorizationHandler>) -> Self {
        self.user_authorization = Some(handler);
        self
    }

    /// Installs the password grant credential check.
    #[must_use]
    pub fn with_password_authorization(
        mut self,
        handler: Arc<dyn PasswordAuthorizationHandler>,
    ) -> Self {
        self.password_authorization = Some(handler);
        self
    }

    /// Installs the per-client grant allow-list.
    #[must_use]
    pub fn with_client_authorized(mut self, handler: Arc<dyn ClientAuthorizedHandler>) -> Self {
        self.client_authorized = Some(handler);
        self
    }

    /// Installs the per-client scope check.
    #[must_use]
    pub fn with_client_scope(mut self, handler: Arc<dyn ClientScopeHandler>) -> Self {
        self.client_scope = Some(handler);
        self
    }

    /// Installs the authorize scope override.
    #[must_use]
    pub fn with_authorize_scope(mut self, handler: Arc<dyn AuthorizeScopeHandler>) -> Self {
        self.authorize_scope = Some(handler);
        self
    }

    /// Installs the authorize access token lifetime override.
    #[must_use]
    pub fn with_access_token_exp(mut self, handler: Arc<dyn AccessTokenExpHandler>) -> Self {
        self.access_token_exp = Some(handler);
        self
    }

    /// Installs the refresh scope check.
    #[must_use]
    pub fn with_refreshing_scope(mut self, handler: Arc<dyn RefreshingScopeHandler>) -> Self {
        self.refreshing_scope = Some(handler);
        self
    }

    /// Installs the refresh validation hook.
    #[must_use]
    pub fn with_refreshing_validation(
        mut self,
        handler: Arc<dyn RefreshingValidationHandler>,
    ) -> Self {
        self.refreshing_validation = Some(handler);
        self
    }

    /// Installs the token response extension fields hook.
    #[must_use]
    pub fn with_extension_fields(mut self, handler: Arc<dyn ExtensionFieldsHandler>) -> Self {
        self.extension_fields = Some(handler);
        self
    }

    /// Installs the internal error mapper.
    #[must_use]
    pub fn with_internal_error(mut self, handler: Arc<dyn InternalErrorHandler>) -> Self {
        self.internal_error = Some(handler);
        self
    }

    /// Installs the error response observer.
    #[must_use]
    pub fn with_response_error(mut self, handler: Arc<dyn ResponseErrorHandler>) -> Self {
        self.response_error = Some(handler);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the token manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    // =========================================================================
    // Authorize Endpoint
    // =========================================================================

    /// Validates an authorize request.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for a method other than GET or POST, or a missing
    ///   `client_id`
    /// - `UnsupportedResponseType` for a missing or unknown `response_type`
    /// - `UnauthorizedClient` for a response type that is not allowed
    /// - `CodeChallengeRequired` if PKCE is forced and no challenge was sent
    /// - `InvalidCodeChallengeLength` for a challenge outside 43..=128
    /// - `UnsupportedCodeChallengeMethod` for an unknown or disallowed method
    pub fn validation_authorize_request(&self, req: &OAuthRequest) -> AuthResult<AuthorizeRequest> {
        if req.method != Method::GET && req.method != Method::POST {
            return Err(AuthError::invalid_request(format!(
                "Method {} is not allowed",
                req.method
            )));
        }

        let client_id = req
            .param("client_id")
            .ok_or_else(|| AuthError::invalid_request("Missing client_id parameter"))?;

        let raw_type = req
            .param("response_type")
            .ok_or_else(|| AuthError::unsupported_response_type(""))?;
        let response_type: ResponseType = raw_type
            .parse()
            .map_err(AuthError::unsupported_response_type)?;
        if !self.config.allows_response_type(response_type) {
            return Err(AuthError::unauthorized_client(format!(
                "Response type '{}' is not allowed",
                response_type
            )));
        }

        let mut ar = AuthorizeRequest::new(response_type, client_id);
        ar.redirect_uri = req.param_owned("redirect_uri");
        ar.scope = req.param_owned("scope").unwrap_or_default();
        ar.state = req.param_owned("state");

        match req.param("code_challenge") {
            None if self.config.force_pkce => return Err(AuthError::CodeChallengeRequired),
            None => {}
            Some(challenge) => {
                validate_challenge_length(challenge)?;
                let method = match req.param("code_challenge_method") {
                    Some(raw) => raw.parse::<CodeChallengeMethod>()?,
                    None => CodeChallengeMethod::default(),
                };
                if !self.config.allows_code_challenge_method(method) {
                    return Err(AuthError::unsupported_code_challenge_method(method.as_str()));
                }
                ar.code_challenge = Some(challenge.to_string());
                ar.code_challenge_method = Some(method);
            }
        }

        Ok(ar)
    }

    /// Handles an authorize request end to end.
    ///
    /// Once the client and its redirect URI are trusted, every failure,
    /// including request validation, is delivered to the client as an error
    /// redirect. A missing or unknown client, an unacceptable redirect URI
    /// and out-of-band clients get the error as `Err`, to be shown to the
    /// user agent directly.
    ///
    /// # Errors
    ///
    /// Returns the error response to render when no redirect is possible.
    pub async fn handle_authorize_request(
        &self,
        req: &OAuthRequest,
    ) -> Result<AuthorizeOutcome, ErrorResponse> {
        let ar = match self.validation_authorize_request(req) {
            Ok(ar) => ar,
            Err(e) => {
                warn!(error = %e, "Authorize request rejected");
                return match redirect_target(req) {
                    Some(target) => self.redirect_error(&target, &e).await,
                    None => Err(self.get_error_data(&e)),
                };
            }
        };

        debug!(
            client_id = %ar.client_id,
            response_type = %ar.response_type,
            "Processing authorize request"
        );

        match self.authorize(req, ar.clone()).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(client_id = %ar.client_id, error = %e, "Authorization failed");
                self.redirect_error(&ar, &e).await
            }
        }
    }

    async fn authorize(
        &self,
        req: &OAuthRequest,
        mut ar: AuthorizeRequest,
    ) -> AuthResult<AuthorizeOutcome> {
        let client = self.manager.get_client(&ar.client_id).await?;
        let redirect_uri = ar
            .redirect_uri
            .clone()
            .unwrap_or_else(|| client.domain.clone());
        self.manager.validate_redirect_uri(&client, &redirect_uri)?;

        let Some(handler) = &self.user_authorization else {
            return Err(AuthError::access_denied(
                "No user authorization handler is configured",
            ));
        };
        let Some(user_id) = handler
            .authorize_user(req)
            .await?
            .filter(|u| !u.is_empty())
        else {
            debug!(client_id = %ar.client_id, "User not yet authorized");
            return Ok(AuthorizeOutcome::Pending);
        };
        ar.user_id = Some(user_id);

        if let Some(hook) = &self.authorize_scope
            && let Some(scope) = hook.authorize_scope(req).await?
        {
            ar.scope = scope;
        }
        if let Some(hook) = &self.access_token_exp
            && let Some(exp) = hook.access_token_exp(req).await?
        {
            ar.access_token_exp = Some(exp);
        }

        let info = self.get_authorize_token(&ar).await?;
        let data = self.get_authorize_data(ar.response_type, &info);

        if redirect_uri == OOB_REDIRECT_URI {
            return Ok(AuthorizeOutcome::OutOfBand(data));
        }

        let url = build_redirect_url(
            &redirect_uri,
            ar.response_type,
            ar.state.as_deref(),
            data_to_params(&data),
        )?;
        Ok(AuthorizeOutcome::Redirect(url))
    }

    /// Delivers an authorize error to the client's redirect URI.
    ///
    /// Falls back to a direct response when the client or its redirect URI
    /// cannot be trusted.
    async fn redirect_error(
        &self,
        ar: &AuthorizeRequest,
        err: &AuthError,
    ) -> Result<AuthorizeOutcome, ErrorResponse> {
        if matches!(
            err,
            AuthError::InvalidClient { .. } | AuthError::InvalidRedirectUri
        ) {
            return Err(self.get_error_data(err));
        }

        let client = match self.manager.get_client(&ar.client_id).await {
            Ok(client) => client,
            Err(client_err) => return Err(self.get_error_data(&client_err)),
        };
        let redirect_uri = ar.redirect_uri.as_deref().unwrap_or(&client.domain);
        if let Err(redirect_err) = self.manager.validate_redirect_uri(&client, redirect_uri) {
            return Err(self.get_error_data(&redirect_err));
        }

        let response = self.get_error_data(err);
        if redirect_uri == OOB_REDIRECT_URI {
            return Err(response);
        }

        build_redirect_url(
            redirect_uri,
            ar.response_type,
            ar.state.as_deref(),
            response.to_params(),
        )
        .map(AuthorizeOutcome::Redirect)
        .map_err(|_| response)
    }

    /// Issues the code or implicit token for an authorized request.
    ///
    /// # Errors
    ///
    /// - `UnauthorizedClient` if the client-authorized hook denies the grant
    /// - `InvalidScope` if the client scope hook denies the scope
    /// - Any error from [`Manager::generate_auth_token`]
    pub async fn get_authorize_token(&self, ar: &AuthorizeRequest) -> AuthResult<TokenInfo> {
        let grant_type = ar.response_type.grant_type();
        if let Some(hook) = &self.client_authorized
            && !hook.is_client_authorized(&ar.client_id, grant_type).await?
        {
            return Err(AuthError::unauthorized_client(format!(
                "Client is not authorized for {}",
                grant_type
            )));
        }

        let tgr = TokenGenerateRequest {
            client_id: ar.client_id.clone(),
            user_id: ar.user_id.clone(),
            redirect_uri: ar.redirect_uri.clone(),
            scope: ar.scope.clone(),
            code_challenge: ar.code_challenge.clone(),
            code_challenge_method: ar.code_challenge_method,
            access_token_exp: ar.access_token_exp,
            ..TokenGenerateRequest::default()
        };

        if let Some(hook) = &self.client_scope
            && !hook.is_scope_allowed(&tgr).await?
        {
            return Err(AuthError::invalid_scope(
                "The requested scope is not allowed for this client",
            ));
        }

        self.manager.generate_auth_token(ar.response_type, &tgr).await
    }

    /// Builds the authorize response data.
    ///
    /// `{"code": ...}` for the code flow, the token data for the implicit flow.
    #[must_use]
    pub fn get_authorize_data(
        &self,
        response_type: ResponseType,
        info: &TokenInfo,
    ) -> Map<String, Value> {
        match response_type {
            ResponseType::Code => {
                let mut data = Map::new();
                data.insert(
                    "code".to_string(),
                    Value::from(info.code_value().unwrap_or_default()),
                );
                data
            }
            ResponseType::Token => self.get_token_data(info),
        }
    }

    // =========================================================================
    // Token Endpoint
    // =========================================================================

    /// Validates a token request and extracts its grant parameters.
    ///
    /// For the password grant this also runs the password hook.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for a disallowed method or a missing parameter
    /// - `UnsupportedGrantType` for a missing, unknown or `implicit` grant
    /// - `InvalidClient` if no client credentials were found
    /// - `AccessDenied` for the password grant without a password hook
    /// - `InvalidGrant` if the password hook rejects the credentials
    pub async fn validation_token_request(
        &self,
        req: &OAuthRequest,
    ) -> AuthResult<(GrantType, TokenGenerateRequest)> {
        let method_allowed = req.method == Method::POST
            || (self.config.allow_get_access_request && req.method == Method::GET);
        if !method_allowed {
            return Err(AuthError::invalid_request(format!(
                "Method {} is not allowed",
                req.method
            )));
        }

        let raw_grant = req
            .param("grant_type")
            .ok_or_else(|| AuthError::unsupported_grant_type(""))?;
        let grant_type: GrantType = raw_grant
            .parse()
            .map_err(AuthError::unsupported_grant_type)?;

        let (client_id, client_secret) = self.client_credentials(req)?;
        let mut tgr = TokenGenerateRequest {
            client_id,
            client_secret,
            scope: req.param_owned("scope").unwrap_or_default(),
            ..TokenGenerateRequest::default()
        };

        match grant_type {
            GrantType::AuthorizationCode => {
                tgr.redirect_uri = req.param_owned("redirect_uri");
                tgr.code = req.param_owned("code");
                tgr.code_verifier = req.param_owned("code_verifier");
                if tgr.redirect_uri.is_none() || tgr.code.is_none() {
                    return Err(AuthError::invalid_request(
                        "redirect_uri and code are required",
                    ));
                }
                if self.config.force_pkce && tgr.code_verifier.is_none() {
                    return Err(AuthError::invalid_request("code_verifier is required"));
                }
            }
            GrantType::Password => {
                let (Some(username), Some(password)) =
                    (req.param("username"), req.param("password"))
                else {
                    return Err(AuthError::invalid_request(
                        "username and password are required",
                    ));
                };
                let Some(handler) = &self.password_authorization else {
                    return Err(AuthError::access_denied("The password grant is not enabled"));
                };
                match handler
                    .authorize_password(&tgr.client_id, username, password)
                    .await?
                {
                    Some(user_id) if !user_id.is_empty() => tgr.user_id = Some(user_id),
                    _ => {
                        warn!(client_id = %tgr.client_id, "Password authentication failed");
                        return Err(AuthError::invalid_grant("Invalid username or password"));
                    }
                }
            }
            GrantType::ClientCredentials => {}
            GrantType::RefreshToken => {
                tgr.refresh = req.param_owned("refresh_token");
                if tgr.refresh.is_none() {
                    return Err(AuthError::invalid_request("refresh_token is required"));
                }
            }
            GrantType::Implicit => {
                return Err(AuthError::unsupported_grant_type(grant_type.as_str()));
            }
        }

        Ok((grant_type, tgr))
    }

    fn client_credentials(&self, req: &OAuthRequest) -> AuthResult<(String, Option<String>)> {
        let form = || {
            req.param_owned("client_id")
                .map(|id| (id, req.param_owned("client_secret")))
        };
        let basic = || req.basic_auth().map(|(id, secret)| (id, Some(secret)));

        let credentials = match self.config.client_credentials_source {
            ClientCredentialsSource::Form => form(),
            ClientCredentialsSource::Basic => basic(),
            ClientCredentialsSource::FormOrBasic => basic().or_else(form),
        };

        credentials
            .filter(|(id, _)| !id.is_empty())
            .ok_or_else(|| AuthError::invalid_client("Missing client credentials"))
    }

    /// Runs a validated token grant.
    ///
    /// Code and refresh failures are collapsed into `invalid_grant` so the
    /// response does not reveal which check failed.
    ///
    /// # Errors
    ///
    /// - `UnauthorizedClient` if the grant is not allowed, globally or for
    ///   this client
    /// - `InvalidScope` if a scope hook denies the request, or a refresh asks
    ///   for scope beyond the original grant
    /// - `InvalidGrant` for any code, PKCE or refresh token failure
    pub async fn get_access_token(
        &self,
        grant_type: GrantType,
        tgr: &TokenGenerateRequest,
    ) -> AuthResult<TokenInfo> {
        if !self.config.allows_grant_type(grant_type) {
            return Err(AuthError::unauthorized_client(format!(
                "Grant type '{}' is not allowed",
                grant_type
            )));
        }
        if let Some(hook) = &self.client_authorized
            && !hook.is_client_authorized(&tgr.client_id, grant_type).await?
        {
            return Err(AuthError::unauthorized_client(format!(
                "Client is not authorized for {}",
                grant_type
            )));
        }

        match grant_type {
            GrantType::AuthorizationCode => self
                .manager
                .generate_access_token(grant_type, tgr)
                .await
                .map_err(|e| match e {
                    AuthError::InvalidAuthorizeCode
                    | AuthError::InvalidCodeChallenge
                    | AuthError::MissingCodeChallenge
                    | AuthError::MissingCodeVerifier => collapse_to_invalid_grant(&e),
                    other => other,
                }),
            GrantType::Password | GrantType::ClientCredentials => {
                if let Some(hook) = &self.client_scope
                    && !hook.is_scope_allowed(tgr).await?
                {
                    return Err(AuthError::invalid_scope(
                        "The requested scope is not allowed for this client",
                    ));
                }
                self.manager.generate_access_token(grant_type, tgr).await
            }
            GrantType::RefreshToken => self.refresh(tgr).await.map_err(|e| match e {
                AuthError::InvalidRefreshToken | AuthError::ExpiredRefreshToken => {
                    collapse_to_invalid_grant(&e)
                }
                other => other,
            }),
            GrantType::Implicit => Err(AuthError::unsupported_grant_type(grant_type.as_str())),
        }
    }

    async fn refresh(&self, tgr: &TokenGenerateRequest) -> AuthResult<TokenInfo> {
        let current = self
            .manager
            .load_refresh_token(tgr.refresh.as_deref().unwrap_or_default())
            .await?;

        if !tgr.scope.is_empty() {
            let allowed = match &self.refreshing_scope {
                Some(hook) => hook.is_refresh_scope_allowed(tgr, &current.scope).await?,
                None => is_scope_subset(&tgr.scope, &current.scope),
            };
            if !allowed {
                return Err(AuthError::invalid_scope(
                    "The requested scope exceeds the scope originally granted",
                ));
            }
        }

        if let Some(hook) = &self.refreshing_validation
            && !hook.validate_refreshing(&current).await?
        {
            return Err(AuthError::invalid_scope("Refresh is not allowed for this grant"));
        }

        self.manager.refresh_access_token(tgr).await
    }

    /// Handles a token request end to end.
    ///
    /// # Errors
    ///
    /// Returns the error response to render.
    pub async fn handle_token_request(
        &self,
        req: &OAuthRequest,
    ) -> Result<Map<String, Value>, ErrorResponse> {
        let result = match self.validation_token_request(req).await {
            Ok((grant_type, tgr)) => self
                .get_access_token(grant_type, &tgr)
                .await
                .map(|info| (grant_type, info)),
            Err(e) => Err(e),
        };

        match result {
            Ok((grant_type, info)) => {
                debug!(client_id = %info.client_id, grant_type = %grant_type, "Token request completed");
                Ok(self.get_token_data(&info))
            }
            Err(e) => {
                warn!(error = %e, category = %e.category(), "Token request failed");
                Err(self.get_error_data(&e))
            }
        }
    }

    /// Builds the token response body.
    ///
    /// `scope` and `refresh_token` are omitted when empty. Extension fields
    /// never replace the standard ones.
    #[must_use]
    pub fn get_token_data(&self, info: &TokenInfo) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(
            "access_token".to_string(),
            Value::from(info.access_value().unwrap_or_default()),
        );
        data.insert(
            "token_type".to_string(),
            Value::from(self.config.token_type.as_str()),
        );
        data.insert(
            "expires_in".to_string(),
            Value::from(info.access_expires_in_secs()),
        );
        if !info.scope.is_empty() {
            data.insert("scope".to_string(), Value::from(info.scope.as_str()));
        }
        if let Some(refresh) = info.refresh_value() {
            data.insert("refresh_token".to_string(), Value::from(refresh));
        }

        if let Some(hook) = &self.extension_fields {
            for (key, value) in hook.extension_fields(info) {
                if RESERVED_TOKEN_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                data.entry(key).or_insert(value);
            }
        }

        data
    }

    /// Maps an error to its response.
    ///
    /// Server errors go through the internal error hook, falling back to a
    /// generic `server_error`. The response error hook sees the result.
    pub fn get_error_data(&self, err: &AuthError) -> ErrorResponse {
        let response = if err.is_server_error() {
            error!(error = %err, category = %err.category(), "Internal authorization server error");
            self.internal_error
                .as_ref()
                .and_then(|hook| hook.handle_internal_error(err))
                .unwrap_or_else(|| ErrorResponse::from(err))
        } else {
            ErrorResponse::from(err)
        };

        if let Some(hook) = &self.response_error {
            hook.handle_response_error(&response);
        }
        response
    }

    // =========================================================================
    // Bearer Tokens
    // =========================================================================

    /// Returns the bearer token of a request.
    ///
    /// The `Authorization` header wins over the `access_token` parameter.
    #[must_use]
    pub fn bearer_auth<'a>(&self, req: &'a OAuthRequest) -> Option<&'a str> {
        req.bearer_token()
    }

    /// Validates the bearer token of a request.
    ///
    /// # Errors
    ///
    /// Returns a token error from [`Manager::load_access_token`], or
    /// `InvalidAccessToken` if the request carries no token.
    pub async fn validation_bearer_token(&self, req: &OAuthRequest) -> AuthResult<TokenInfo> {
        let token = self
            .bearer_auth(req)
            .ok_or(AuthError::InvalidAccessToken)?;
        let info = self.manager.load_access_token(token).await?;
        info!(client_id = %info.client_id, user_id = ?info.user_id, "Bearer token accepted");
        Ok(info)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

/// Where to report a failed authorize validation: the client, redirect URI,
/// state and response mode the request names, if it names a client at all.
fn redirect_target(req: &OAuthRequest) -> Option<AuthorizeRequest> {
    if req.method != Method::GET && req.method != Method::POST {
        return None;
    }
    let client_id = req.param("client_id")?;
    let response_type = req
        .param("response_type")
        .and_then(|raw| raw.parse::<ResponseType>().ok())
        .unwrap_or(ResponseType::Code);

    let mut target = AuthorizeRequest::new(response_type, client_id);
    target.redirect_uri = req.param_owned("redirect_uri");
    target.state = req.param_owned("state");
    Some(target)
}

fn collapse_to_invalid_grant(err: &AuthError) -> AuthError {
    debug!(error = %err, "Grant rejected");
    AuthError::invalid_grant(INVALID_GRANT_DESCRIPTION)
}

/// Returns `true` if every scope in `requested` is also in `granted`.
fn is_scope_subset(requested: &str, granted: &str) -> bool {
    let granted: Vec<&str> = granted.split_whitespace().collect();
    requested
        .split_whitespace()
        .all(|scope| granted.contains(&scope))
}
