//! Token lifecycle manager.
//!
//! The [`Manager`] is the only component that mutates token state. It
//! resolves the grant policy, mints values through the generators and
//! persists records through the [`TokenStore`].
//!
//! # Lifecycle
//!
//! ```text
//! Pending (code issued)
//!   -> Exchanged (code consumed, access issued)
//!   -> Refreshed*
//!   -> Revoked | Expired
//! ```
//!
//! Expiry is detected lazily when a value is loaded; nothing is swept.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::AuthResult;
use crate::config::{GrantConfig, ManagerConfig};
use crate::error::AuthError;
use crate::oauth::client_auth::{
    ClientSecretVerifier, DomainRedirectValidator, PlainSecretVerifier, RedirectUriValidator,
};
use crate::oauth::token::TokenGenerateRequest;
use crate::storage::{ClientStore, TokenStore};
use crate::token::{
    AccessGenerate, AccessGenerator, AuthorizeGenerate, AuthorizeGenerator, GenerateBasic,
};
use crate::types::{Client, GrantType, IssuedToken, ResponseType, TokenInfo};

/// OAuth 2.0 token manager.
///
/// Holds no mutable state of its own and is safe to share between request
/// handlers.
///
/// # Example
///
/// ```ignore
/// let manager = Manager::new(ManagerConfig::default(), client_store, token_store)
///     .with_access_generator(Arc::new(JwtAccessGenerate::new(secret, HmacAlgorithm::HS256)));
///
/// let info = manager
///     .generate_access_token(GrantType::ClientCredentials, &TokenGenerateRequest::new("svc").with_secret("s"))
///     .await?;
/// ```
pub struct Manager {
    config: ManagerConfig,
    client_store: Arc<dyn ClientStore>,
    token_store: Arc<dyn TokenStore>,
    authorize_generator: Arc<dyn AuthorizeGenerator>,
    access_generator: Arc<dyn AccessGenerator>,
    redirect_validator: Arc<dyn RedirectUriValidator>,
    secret_verifier: Arc<dyn ClientSecretVerifier>,
}

impl Manager {
    /// Creates a manager with the default generators and validators.
    pub fn new(
        config: ManagerConfig,
        client_store: Arc<dyn ClientStore>,
        token_store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            config,
            client_store,
            token_store,
            authorize_generator: Arc::new(AuthorizeGenerate),
            access_generator: Arc::new(AccessGenerate),
            redirect_validator: Arc::new(DomainRedirectValidator),
            secret_verifier: Arc::new(PlainSecretVerifier),
        }
    }

    /// Replaces the authorization code generator.
    #[must_use]
    pub fn with_authorize_generator(mut self, generator: Arc<dyn AuthorizeGenerator>) -> Self {
        self.authorize_generator = generator;
        self
    }

    /// Replaces the access token generator.
    #[must_use]
    pub fn with_access_generator(mut self, generator: Arc<dyn AccessGenerator>) -> Self {
        self.access_generator = generator;
        self
    }

    /// Replaces the redirect URI validator.
    #[must_use]
    pub fn with_redirect_validator(mut self, validator: Arc<dyn RedirectUriValidator>) -> Self {
        self.redirect_validator = validator;
        self
    }

    /// Replaces the client secret verifier.
    #[must_use]
    pub fn with_secret_verifier(mut self, verifier: Arc<dyn ClientSecretVerifier>) -> Self {
        self.secret_verifier = verifier;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    /// Looks up a client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClient` if the client is unknown.
    pub async fn get_client(&self, client_id: &str) -> AuthResult<Client> {
        self.client_store
            .get_by_id(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Client authentication failed"))
    }

    /// Checks that a redirect URI belongs to the client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRedirectUri` if it does not.
    pub fn validate_redirect_uri(&self, client: &Client, redirect_uri: &str) -> AuthResult<()> {
        self.redirect_validator
            .validate(&client.domain, redirect_uri)
            .inspect_err(|_| {
                debug!(client_id = %client.id, redirect_uri, "Redirect URI outside client domain");
            })
    }

    fn authenticate_client(&self, client: &Client, secret: Option<&str>) -> AuthResult<()> {
        if self.secret_verifier.verify(client, secret.unwrap_or_default()) {
            Ok(())
        } else {
            warn!(client_id = %client.id, "Client secret verification failed");
            Err(AuthError::invalid_client("Client authentication failed"))
        }
    }

    fn grant_config(&self, grant_type: GrantType) -> AuthResult<&GrantConfig> {
        self.config
            .grant(grant_type)
            .ok_or_else(|| AuthError::unsupported_grant_type(grant_type.as_str()))
    }

    // -------------------------------------------------------------------------
    // Issuance
    // -------------------------------------------------------------------------

    /// Issues an authorization code (`code`) or an implicit access token
    /// (`token`).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The client is unknown
    /// - The redirect URI is outside the client's domain
    /// - Generation or storage fails
    pub async fn generate_auth_token(
        &self,
        response_type: ResponseType,
        req: &TokenGenerateRequest,
    ) -> AuthResult<TokenInfo> {
        let client = self.get_client(&req.client_id).await?;
        if let Some(redirect_uri) = req.redirect_uri.as_deref() {
            self.validate_redirect_uri(&client, redirect_uri)?;
        }

        let now = OffsetDateTime::now_utc();
        let mut info = TokenInfo {
            client_id: req.client_id.clone(),
            user_id: req.user_id.clone(),
            redirect_uri: req.redirect_uri.clone(),
            scope: req.scope.clone(),
            ..TokenInfo::default()
        };

        match response_type {
            ResponseType::Code => {
                info.granted_access_exp = non_zero(req.access_token_exp);
                if let Some(challenge) = req.code_challenge.as_deref().filter(|c| !c.is_empty()) {
                    info.code_challenge = Some(challenge.to_string());
                    info.code_challenge_method = Some(req.code_challenge_method.unwrap_or_default());
                }

                let data = GenerateBasic {
                    client: &client,
                    user_id: req.user_id.as_deref(),
                    created_at: now,
                    access_exp: Duration::ZERO,
                };
                let code = self.authorize_generator.token(&data);
                info.code = Some(IssuedToken::new(code, now, self.config.authorize_code_exp));
            }
            ResponseType::Token => {
                let grant = &self.config.implicit;
                let access_exp = non_zero(req.access_token_exp).unwrap_or(grant.access_token_exp);
                self.issue_access(&client, &mut info, now, access_exp, refresh_exp(grant))?;
            }
        }

        self.token_store.create(&info).await?;

        info!(
            client_id = %info.client_id,
            user_id = ?info.user_id,
            response_type = %response_type,
            pkce = info.code_challenge.is_some(),
            "Authorization granted"
        );

        Ok(info)
    }

    /// Issues an access token for a token endpoint grant.
    ///
    /// For `authorization_code` the code is consumed whether or not the
    /// exchange succeeds. The user, scope and granted access lifetime are
    /// taken from the code record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The client is unknown or fails authentication
    /// - The redirect URI is outside the client's domain
    /// - A public client uses `client_credentials`
    /// - The code is unknown, expired, or bound to another client or redirect
    ///   URI (`InvalidAuthorizeCode`)
    /// - The PKCE verifier is missing or wrong
    /// - The grant is `implicit`, which has no token endpoint exchange
    pub async fn generate_access_token(
        &self,
        grant_type: GrantType,
        req: &TokenGenerateRequest,
    ) -> AuthResult<TokenInfo> {
        if grant_type == GrantType::RefreshToken {
            return self.refresh_access_token(req).await;
        }
        if grant_type == GrantType::Implicit {
            return Err(AuthError::unsupported_grant_type(grant_type.as_str()));
        }
        let grant = self.grant_config(grant_type)?;

        let client = self.get_client(&req.client_id).await?;
        self.authenticate_client(&client, req.client_secret.as_deref())?;
        if let Some(redirect_uri) = req.redirect_uri.as_deref() {
            self.validate_redirect_uri(&client, redirect_uri)?;
        }
        if grant_type == GrantType::ClientCredentials && client.is_public() {
            warn!(client_id = %client.id, "Public client attempted client_credentials");
            return Err(AuthError::invalid_client(
                "Public clients cannot use the client_credentials grant",
            ));
        }

        let mut user_id = req.user_id.clone();
        let mut scope = req.scope.clone();
        let mut access_exp = non_zero(req.access_token_exp);

        if grant_type == GrantType::AuthorizationCode {
            let code_info = self.consume_authorization_code(req).await?;
            verify_code_challenge(&code_info, req.code_verifier.as_deref())?;

            user_id = code_info.user_id;
            scope = code_info.scope;
            if let Some(exp) = code_info.granted_access_exp {
                access_exp = Some(exp);
            }
        }

        let now = OffsetDateTime::now_utc();
        let mut info = TokenInfo {
            client_id: req.client_id.clone(),
            user_id,
            redirect_uri: req.redirect_uri.clone(),
            scope,
            ..TokenInfo::default()
        };
        let access_exp = access_exp.unwrap_or(grant.access_token_exp);
        self.issue_access(&client, &mut info, now, access_exp, refresh_exp(grant))?;

        self.token_store.create(&info).await?;

        info!(
            client_id = %info.client_id,
            user_id = ?info.user_id,
            grant_type = %grant_type,
            refresh = info.refresh.is_some(),
            "Access token issued"
        );

        Ok(info)
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Under the default policy the refresh token is rotated and both
    /// previous values are revoked. When the policy does not issue a new
    /// refresh token, the record loses its refresh token and the previous
    /// one is revoked: the grant cannot be refreshed again.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The client is unknown or fails authentication
    /// - The refresh token is unknown or bound to another client
    ///   (`InvalidRefreshToken`)
    /// - The refresh token has expired (`ExpiredRefreshToken`)
    pub async fn refresh_access_token(&self, req: &TokenGenerateRequest) -> AuthResult<TokenInfo> {
        let client = self.get_client(&req.client_id).await?;
        self.authenticate_client(&client, req.client_secret.as_deref())?;

        let policy = &self.config.refresh;
        // The old refresh token is revoked by this exchange, so take it
        // atomically: concurrent exchanges of one token have a single winner.
        let single_use = policy.is_remove_refreshing || !policy.is_generate_refresh;

        let presented = req.refresh.as_deref().unwrap_or_default();
        let mut info = if single_use {
            self.consume_refresh_token(presented).await?
        } else {
            self.load_refresh_token(presented).await?
        };
        if info.client_id != req.client_id {
            warn!(client_id = %req.client_id, "Refresh token presented by another client");
            return Err(AuthError::InvalidRefreshToken);
        }

        let old_access = info.access_value().map(str::to_string);
        let old_refresh = info.refresh.clone();

        let now = OffsetDateTime::now_utc();

        if !req.scope.is_empty() {
            info.scope.clone_from(&req.scope);
        }

        let access_exp = policy
            .access_token_exp
            .or_else(|| info.access.as_ref().map(|a| a.expires_in))
            .unwrap_or(self.config.authorization_code.access_token_exp);

        let data = GenerateBasic {
            client: &client,
            user_id: info.user_id.as_deref(),
            created_at: now,
            access_exp,
        };
        let (access, refresh) = self.access_generator.token(&data, policy.is_generate_refresh)?;

        info.access = Some(IssuedToken::new(access, now, access_exp));
        match (refresh, &old_refresh) {
            (Some(value), Some(old)) => {
                let created_at = if policy.is_reset_refresh_time {
                    now
                } else {
                    old.created_at
                };
                let expires_in = policy.refresh_token_exp.unwrap_or(old.expires_in);
                info.refresh = Some(IssuedToken::new(value, created_at, expires_in));
            }
            (Some(value), None) => {
                let expires_in = policy.refresh_token_exp.unwrap_or_default();
                info.refresh = Some(IssuedToken::new(value, now, expires_in));
            }
            (None, _) => info.clear_refresh(),
        }

        self.token_store.create(&info).await?;

        if policy.is_remove_access
            && let Some(old_access) = old_access.as_deref()
        {
            self.token_store.remove_by_access(old_access).await?;
        }
        if let Some(old) = old_refresh
            && !single_use
            && info.refresh.is_none()
        {
            self.token_store.remove_by_refresh(&old.value).await?;
        }

        info!(
            client_id = %info.client_id,
            user_id = ?info.user_id,
            rotated = info.refresh.is_some(),
            "Access token refreshed"
        );

        Ok(info)
    }

    fn issue_access(
        &self,
        client: &Client,
        info: &mut TokenInfo,
        now: OffsetDateTime,
        access_exp: Duration,
        refresh_exp: Option<Duration>,
    ) -> AuthResult<()> {
        let data = GenerateBasic {
            client,
            user_id: info.user_id.as_deref(),
            created_at: now,
            access_exp,
        };
        let (access, refresh) = self.access_generator.token(&data, refresh_exp.is_some())?;

        info.access = Some(IssuedToken::new(access, now, access_exp));
        if let (Some(refresh), Some(exp)) = (refresh, refresh_exp) {
            info.refresh = Some(IssuedToken::new(refresh, now, exp));
        }
        Ok(())
    }

    async fn consume_authorization_code(&self, req: &TokenGenerateRequest) -> AuthResult<TokenInfo> {
        let code = req
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::InvalidAuthorizeCode)?;

        let Some(info) = self.token_store.consume_by_code(code).await? else {
            debug!(client_id = %req.client_id, "Authorization code not found");
            return Err(AuthError::InvalidAuthorizeCode);
        };

        let Some(issued) = info.code.as_ref().filter(|c| c.value == code) else {
            return Err(AuthError::InvalidAuthorizeCode);
        };
        if issued.is_expired() {
            debug!(client_id = %req.client_id, "Authorization code expired");
            return Err(AuthError::InvalidAuthorizeCode);
        }
        if info.client_id != req.client_id {
            warn!(
                client_id = %req.client_id,
                issued_to = %info.client_id,
                "Authorization code presented by another client"
            );
            return Err(AuthError::InvalidAuthorizeCode);
        }
        if let Some(code_uri) = info.redirect_uri.as_deref()
            && Some(code_uri) != req.redirect_uri.as_deref()
        {
            debug!(client_id = %req.client_id, "Redirect URI differs from authorization request");
            return Err(AuthError::InvalidAuthorizeCode);
        }

        Ok(info)
    }

    // -------------------------------------------------------------------------
    // Revocation and validation
    // -------------------------------------------------------------------------

    /// Revokes an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidAccessToken` for an empty value.
    pub async fn remove_access_token(&self, access: &str) -> AuthResult<()> {
        if access.is_empty() {
            return Err(AuthError::InvalidAccessToken);
        }
        self.token_store.remove_by_access(access).await
    }

    /// Revokes a refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRefreshToken` for an empty value.
    pub async fn remove_refresh_token(&self, refresh: &str) -> AuthResult<()> {
        if refresh.is_empty() {
            return Err(AuthError::InvalidRefreshToken);
        }
        self.token_store.remove_by_refresh(refresh).await
    }

    /// Loads and validates an access token.
    ///
    /// # Errors
    ///
    /// - `InvalidAccessToken` if unknown
    /// - `ExpiredRefreshToken` if the paired refresh token has expired
    /// - `ExpiredAccessToken` if the access token has expired
    pub async fn load_access_token(&self, access: &str) -> AuthResult<TokenInfo> {
        if access.is_empty() {
            return Err(AuthError::InvalidAccessToken);
        }
        let info = self
            .token_store
            .get_by_access(access)
            .await?
            .filter(|info| info.access_value() == Some(access))
            .ok_or(AuthError::InvalidAccessToken)?;

        let now = OffsetDateTime::now_utc();
        if info.refresh.as_ref().is_some_and(|r| r.is_expired_at(now)) {
            return Err(AuthError::ExpiredRefreshToken);
        }
        if info.access.as_ref().is_some_and(|a| a.is_expired_at(now)) {
            return Err(AuthError::ExpiredAccessToken);
        }
        Ok(info)
    }

    /// Loads and validates a refresh token.
    ///
    /// # Errors
    ///
    /// - `InvalidRefreshToken` if unknown
    /// - `ExpiredRefreshToken` if expired
    pub async fn load_refresh_token(&self, refresh: &str) -> AuthResult<TokenInfo> {
        if refresh.is_empty() {
            return Err(AuthError::InvalidRefreshToken);
        }
        let info = self
            .token_store
            .get_by_refresh(refresh)
            .await?
            .filter(|info| info.refresh_value() == Some(refresh))
            .ok_or(AuthError::InvalidRefreshToken)?;

        if info.refresh.as_ref().is_some_and(IssuedToken::is_expired) {
            return Err(AuthError::ExpiredRefreshToken);
        }
        Ok(info)
    }
}

impl Manager {
    /// Like [`load_refresh_token`](Self::load_refresh_token), but removes the
    /// refresh token in the same store operation. An expired token is
    /// removed as well.
    async fn consume_refresh_token(&self, refresh: &str) -> AuthResult<TokenInfo> {
        if refresh.is_empty() {
            return Err(AuthError::InvalidRefreshToken);
        }
        let info = self
            .token_store
            .consume_by_refresh(refresh)
            .await?
            .filter(|info| info.refresh_value() == Some(refresh))
            .ok_or(AuthError::InvalidRefreshToken)?;

        if info.refresh.as_ref().is_some_and(IssuedToken::is_expired) {
            return Err(AuthError::ExpiredRefreshToken);
        }
        Ok(info)
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn non_zero(exp: Option<Duration>) -> Option<Duration> {
    exp.filter(|d| !d.is_zero())
}

fn refresh_exp(grant: &GrantConfig) -> Option<Duration> {
    grant.is_generate_refresh.then_some(grant.refresh_token_exp)
}

/// Checks a PKCE verifier against the challenge stored with a code.
///
/// A code without a challenge must be redeemed without a verifier and the
/// other way round.
fn verify_code_challenge(info: &TokenInfo, verifier: Option<&str>) -> AuthResult<()> {
    let challenge = info.code_challenge.as_deref().filter(|c| !c.is_empty());
    let verifier = verifier.filter(|v| !v.is_empty());

    match (challenge, verifier) {
        (None, None) => Ok(()),
        (Some(_), None) => Err(AuthError::MissingCodeVerifier),
        (None, Some(_)) => Err(AuthError::MissingCodeChallenge),
        (Some(challenge), Some(verifier)) => {
            let method = info.code_challenge_method.unwrap_or_default();
            if method.validate(challenge, verifier) {
                Ok(())
            } else {
                Err(AuthError::InvalidCodeChallenge)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::RwLock;

    use async_trait::async_trait;

    use super::*;
    use crate::config::RefreshConfig;
    use crate::oauth::pkce::{CodeChallengeMethod, s256_challenge};
    use crate::storage::MemoryClientStore;
    use crate::token::{HmacAlgorithm, JwtAccessGenerate};

    pub(crate) const DOMAIN: &str = "https://app.example.com";
    pub(crate) const REDIRECT: &str = "https://app.example.com/cb";

    /// Mock token store keeping whole records in a list.
    #[derive(Default)]
    pub(crate) struct MockTokenStore {
        records: RwLock<Vec<TokenInfo>>,
    }

    impl MockTokenStore {
        pub(crate) fn len(&self) -> usize {
            self.records.read().unwrap().len()
        }

        fn find(&self, pred: impl Fn(&TokenInfo) -> bool) -> Option<TokenInfo> {
            self.records.read().unwrap().iter().find(|r| pred(r)).cloned()
        }

        fn clear(&self, clear: impl Fn(&mut TokenInfo) -> bool) {
            let mut records = self.records.write().unwrap();
            for record in records.iter_mut() {
                clear(record);
            }
            records.retain(|r| r.code.is_some() || r.access.is_some() || r.refresh.is_some());
        }
    }

    #[async_trait]
    impl TokenStore for MockTokenStore {
        async fn create(&self, info: &TokenInfo) -> AuthResult<()> {
            self.records.write().unwrap().push(info.clone());
            Ok(())
        }

        async fn remove_by_code(&self, code: &str) -> AuthResult<()> {
            self.clear(|r| r.code_value() == Some(code) && r.code.take().is_some());
            Ok(())
        }

        async fn remove_by_access(&self, access: &str) -> AuthResult<()> {
            self.clear(|r| r.access_value() == Some(access) && r.access.take().is_some());
            Ok(())
        }

        async fn remove_by_refresh(&self, refresh: &str) -> AuthResult<()> {
            self.clear(|r| r.refresh_value() == Some(refresh) && r.refresh.take().is_some());
            Ok(())
        }

        async fn get_by_code(&self, code: &str) -> AuthResult<Option<TokenInfo>> {
            Ok(self.find(|r| r.code_value() == Some(code)))
        }

        async fn get_by_access(&self, access: &str) -> AuthResult<Option<TokenInfo>> {
            Ok(self.find(|r| r.access_value() == Some(access)))
        }

        async fn get_by_refresh(&self, refresh: &str) -> AuthResult<Option<TokenInfo>> {
            Ok(self.find(|r| r.refresh_value() == Some(refresh)))
        }

        async fn consume_by_code(&self, code: &str) -> AuthResult<Option<TokenInfo>> {
            let mut records = self.records.write().unwrap();
            let index = records.iter().position(|r| r.code_value() == Some(code));
            Ok(index.map(|i| records.remove(i)))
        }

        async fn consume_by_refresh(&self, refresh: &str) -> AuthResult<Option<TokenInfo>> {
            let mut records = self.records.write().unwrap();
            let Some(index) = records.iter().position(|r| r.refresh_value() == Some(refresh))
            else {
                return Ok(None);
            };
            let before = records[index].clone();
            records[index].refresh = None;
            if records[index].code.is_none() && records[index].access.is_none() {
                records.remove(index);
            }
            Ok(Some(before))
        }
    }

    pub(crate) fn clients() -> Arc<MemoryClientStore> {
        Arc::new(MemoryClientStore::with_clients([
            Client::new("app", DOMAIN).with_secret("s3cret"),
            Client::new("spa", DOMAIN),
            Client::new("other", "https://other.example.org").with_secret("other-secret"),
        ]))
    }

    fn manager_with(config: ManagerConfig) -> (Manager, Arc<MockTokenStore>) {
        let store = Arc::new(MockTokenStore::default());
        let manager = Manager::new(config, clients(), store.clone());
        (manager, store)
    }

    fn manager() -> (Manager, Arc<MockTokenStore>) {
        manager_with(ManagerConfig::default())
    }

    fn code_request(client_id: &str) -> TokenGenerateRequest {
        TokenGenerateRequest::new(client_id)
            .with_user_id("alice")
            .with_redirect_uri(REDIRECT)
            .with_scope("read write")
    }

    async fn issue_code(manager: &Manager, req: &TokenGenerateRequest) -> String {
        let info = manager
            .generate_auth_token(ResponseType::Code, req)
            .await
            .unwrap();
        info.code_value().unwrap().to_string()
    }

    fn exchange(code: &str) -> TokenGenerateRequest {
        TokenGenerateRequest::new("app")
            .with_secret("s3cret")
            .with_redirect_uri(REDIRECT)
            .with_code(code)
    }

    #[tokio::test]
    async fn test_get_client() {
        let (manager, _) = manager();
        assert_eq!(manager.get_client("app").await.unwrap().id, "app");
        assert!(matches!(
            manager.get_client("nope").await,
            Err(AuthError::InvalidClient { .. })
        ));
    }

    #[tokio::test]
    async fn test_code_round_trip_preserves_scope_and_user() {
        let (manager, _) = manager();
        let code = issue_code(&manager, &code_request("app")).await;

        let info = manager
            .generate_access_token(GrantType::AuthorizationCode, &exchange(&code))
            .await
            .unwrap();

        assert_eq!(info.scope, "read write");
        assert_eq!(info.user_id.as_deref(), Some("alice"));
        assert!(info.code.is_none());
        assert_eq!(info.access.as_ref().unwrap().expires_in, Duration::from_secs(7200));
        assert!(info.refresh.is_some());

        let loaded = manager
            .load_access_token(info.access_value().unwrap())
            .await
            .unwrap();
        assert_eq!(loaded, info);
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let (manager, _) = manager();
        let code = issue_code(&manager, &code_request("app")).await;

        assert!(
            manager
                .generate_access_token(GrantType::AuthorizationCode, &exchange(&code))
                .await
                .is_ok()
        );
        assert_eq!(
            manager
                .generate_access_token(GrantType::AuthorizationCode, &exchange(&code))
                .await,
            Err(AuthError::InvalidAuthorizeCode)
        );
    }

    #[tokio::test]
    async fn test_expired_code() {
        let (manager, store) = manager();
        let mut info = TokenInfo::new("app");
        info.code = Some(IssuedToken::new(
            "OLD",
            OffsetDateTime::now_utc() - time::Duration::minutes(11),
            Duration::from_secs(600),
        ));
        store.create(&info).await.unwrap();

        assert_eq!(
            manager
                .generate_access_token(GrantType::AuthorizationCode, &exchange("OLD"))
                .await,
            Err(AuthError::InvalidAuthorizeCode)
        );
    }

    #[tokio::test]
    async fn test_code_bound_to_client_and_redirect() {
        let (manager, _) = manager();

        let code = issue_code(&manager, &code_request("app")).await;
        let other_client = TokenGenerateRequest::new("spa")
            .with_redirect_uri(REDIRECT)
            .with_code(&code);
        assert_eq!(
            manager
                .generate_access_token(GrantType::AuthorizationCode, &other_client)
                .await,
            Err(AuthError::InvalidAuthorizeCode)
        );

        let code = issue_code(&manager, &code_request("app")).await;
        let other_redirect = exchange(&code).with_redirect_uri("https://app.example.com/other");
        assert_eq!(
            manager
                .generate_access_token(GrantType::AuthorizationCode, &other_redirect)
                .await,
            Err(AuthError::InvalidAuthorizeCode)
        );
    }

    #[tokio::test]
    async fn test_redirect_outside_domain_rejected() {
        let (manager, store) = manager();
        let req = code_request("app").with_redirect_uri("https://evil.example.net/cb");
        assert_eq!(
            manager.generate_auth_token(ResponseType::Code, &req).await,
            Err(AuthError::InvalidRedirectUri)
        );
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected_before_code_is_consumed() {
        let (manager, store) = manager();
        let code = issue_code(&manager, &code_request("app")).await;

        let req = exchange(&code).with_secret("wrong");
        assert!(matches!(
            manager
                .generate_access_token(GrantType::AuthorizationCode, &req)
                .await,
            Err(AuthError::InvalidClient { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_pkce_s256() {
        let (manager, _) = manager();
        let req = code_request("spa")
            .with_code_challenge(s256_challenge("verifier123"), CodeChallengeMethod::S256);

        let code = issue_code(&manager, &req).await;
        let good = TokenGenerateRequest::new("spa")
            .with_redirect_uri(REDIRECT)
            .with_code(&code)
            .with_code_verifier("verifier123");
        assert!(
            manager
                .generate_access_token(GrantType::AuthorizationCode, &good)
                .await
                .is_ok()
        );

        let code = issue_code(&manager, &req).await;
        let bad = good.clone().with_code(&code).with_code_verifier("verifier124");
        assert_eq!(
            manager
                .generate_access_token(GrantType::AuthorizationCode, &bad)
                .await,
            Err(AuthError::InvalidCodeChallenge)
        );
    }

    #[tokio::test]
    async fn test_pkce_presence_must_match() {
        let (manager, _) = manager();

        let with_challenge =
            code_request("spa").with_code_challenge("a".repeat(43), CodeChallengeMethod::Plain);
        let code = issue_code(&manager, &with_challenge).await;
        let no_verifier = TokenGenerateRequest::new("spa")
            .with_redirect_uri(REDIRECT)
            .with_code(&code);
        assert_eq!(
            manager
                .generate_access_token(GrantType::AuthorizationCode, &no_verifier)
                .await,
            Err(AuthError::MissingCodeVerifier)
        );

        let code = issue_code(&manager, &code_request("spa")).await;
        let stray_verifier = TokenGenerateRequest::new("spa")
            .with_redirect_uri(REDIRECT)
            .with_code(&code)
            .with_code_verifier("a".repeat(43));
        assert_eq!(
            manager
                .generate_access_token(GrantType::AuthorizationCode, &stray_verifier)
                .await,
            Err(AuthError::MissingCodeChallenge)
        );
    }

    #[tokio::test]
    async fn test_granted_access_exp_carried_from_code() {
        let (manager, _) = manager();
        let req = code_request("app").with_access_token_exp(Duration::from_secs(60));
        let code = issue_code(&manager, &req).await;

        let info = manager
            .generate_access_token(GrantType::AuthorizationCode, &exchange(&code))
            .await
            .unwrap();
        assert_eq!(info.access.unwrap().expires_in, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_implicit_issues_access_only() {
        let (manager, _) = manager();
        let info = manager
            .generate_auth_token(ResponseType::Token, &code_request("spa"))
            .await
            .unwrap();

        assert!(info.code.is_none());
        assert!(info.refresh.is_none());
        assert_eq!(info.access.unwrap().expires_in, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_client_credentials() {
        let (manager, _) = manager();

        let req = TokenGenerateRequest::new("app")
            .with_secret("s3cret")
            .with_scope("system");
        let info = manager
            .generate_access_token(GrantType::ClientCredentials, &req)
            .await
            .unwrap();
        assert!(info.user_id.is_none());
        assert!(info.refresh.is_none());
        assert_eq!(info.scope, "system");

        let public = TokenGenerateRequest::new("spa");
        assert!(matches!(
            manager
                .generate_access_token(GrantType::ClientCredentials, &public)
                .await,
            Err(AuthError::InvalidClient { .. })
        ));
    }

    #[tokio::test]
    async fn test_implicit_is_not_a_token_grant() {
        let (manager, _) = manager();
        assert!(matches!(
            manager
                .generate_access_token(GrantType::Implicit, &TokenGenerateRequest::new("spa"))
                .await,
            Err(AuthError::UnsupportedGrantType { .. })
        ));
    }

    async fn password_grant(manager: &Manager) -> TokenInfo {
        let req = TokenGenerateRequest::new("app")
            .with_secret("s3cret")
            .with_user_id("alice")
            .with_scope("read write");
        manager
            .generate_access_token(GrantType::Password, &req)
            .await
            .unwrap()
    }

    fn refresh_request(refresh: &str) -> TokenGenerateRequest {
        TokenGenerateRequest::new("app")
            .with_secret("s3cret")
            .with_refresh(refresh)
    }

    #[tokio::test]
    async fn test_refresh_rotation() {
        let (manager, store) = manager();
        let first = password_grant(&manager).await;
        let old_access = first.access_value().unwrap();
        let old_refresh = first.refresh_value().unwrap();

        let second = manager
            .refresh_access_token(&refresh_request(old_refresh))
            .await
            .unwrap();

        assert_ne!(second.access_value().unwrap(), old_access);
        assert_ne!(second.refresh_value().unwrap(), old_refresh);
        assert_eq!(second.scope, "read write");
        // Rotation keeps the original refresh window.
        assert_eq!(
            second.refresh.as_ref().unwrap().created_at,
            first.refresh.as_ref().unwrap().created_at
        );

        assert_eq!(
            manager.load_access_token(old_access).await,
            Err(AuthError::InvalidAccessToken)
        );
        assert_eq!(
            manager.load_refresh_token(old_refresh).await,
            Err(AuthError::InvalidRefreshToken)
        );
        assert!(
            manager
                .load_access_token(second.access_value().unwrap())
                .await
                .is_ok()
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_regeneration_clears_refresh() {
        let config = ManagerConfig {
            refresh: RefreshConfig {
                is_generate_refresh: false,
                is_remove_refreshing: false,
                ..RefreshConfig::default()
            },
            ..ManagerConfig::default()
        };
        let (manager, _) = manager_with(config);
        let first = password_grant(&manager).await;
        let old_refresh = first.refresh_value().unwrap();

        let second = manager
            .refresh_access_token(&refresh_request(old_refresh))
            .await
            .unwrap();
        assert!(second.refresh.is_none());

        let stored = manager
            .load_access_token(second.access_value().unwrap())
            .await
            .unwrap();
        assert!(stored.refresh.is_none());

        assert_eq!(
            manager
                .refresh_access_token(&refresh_request(old_refresh))
                .await,
            Err(AuthError::InvalidRefreshToken)
        );
    }

    #[tokio::test]
    async fn test_refresh_policy_overrides() {
        let config = ManagerConfig {
            refresh: RefreshConfig {
                access_token_exp: Some(Duration::from_secs(300)),
                refresh_token_exp: Some(Duration::from_secs(900)),
                is_reset_refresh_time: true,
                is_remove_access: false,
                ..RefreshConfig::default()
            },
            ..ManagerConfig::default()
        };
        let (manager, _) = manager_with(config);
        let first = password_grant(&manager).await;

        let second = manager
            .refresh_access_token(&refresh_request(first.refresh_value().unwrap()).with_scope("read"))
            .await
            .unwrap();

        let refresh = second.refresh.as_ref().unwrap();
        assert_eq!(second.access.as_ref().unwrap().expires_in, Duration::from_secs(300));
        assert_eq!(refresh.expires_in, Duration::from_secs(900));
        assert!(refresh.created_at >= first.refresh.as_ref().unwrap().created_at);
        assert_eq!(second.scope, "read");

        // Old access token survives when removal is disabled.
        assert!(
            manager
                .load_access_token(first.access_value().unwrap())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_concurrent_refresh_has_one_winner() {
        let (manager, _) = manager();
        let manager = Arc::new(manager);
        let first = password_grant(&manager).await;
        let refresh = first.refresh_value().unwrap().to_string();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let refresh = refresh.clone();
                tokio::spawn(async move {
                    manager
                        .refresh_access_token(&refresh_request(&refresh))
                        .await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(e) => assert_eq!(e, AuthError::InvalidRefreshToken),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_refresh_kept_when_removal_disabled() {
        let config = ManagerConfig {
            refresh: RefreshConfig {
                is_remove_refreshing: false,
                ..RefreshConfig::default()
            },
            ..ManagerConfig::default()
        };
        let (manager, _) = manager_with(config);
        let first = password_grant(&manager).await;
        let old_refresh = first.refresh_value().unwrap();

        let second = manager
            .refresh_access_token(&refresh_request(old_refresh))
            .await
            .unwrap();
        assert_ne!(second.refresh_value().unwrap(), old_refresh);
        assert!(manager.load_refresh_token(old_refresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_bound_to_client() {
        let (manager, _) = manager();
        let first = password_grant(&manager).await;

        let req = TokenGenerateRequest::new("other")
            .with_secret("other-secret")
            .with_refresh(first.refresh_value().unwrap());
        assert_eq!(
            manager.refresh_access_token(&req).await,
            Err(AuthError::InvalidRefreshToken)
        );
    }

    #[tokio::test]
    async fn test_load_expired_tokens() {
        let (manager, store) = manager();
        let long_ago = OffsetDateTime::now_utc() - time::Duration::hours(3);

        let mut expired_access = TokenInfo::new("app");
        expired_access.access = Some(IssuedToken::new("A1", long_ago, Duration::from_secs(3600)));
        expired_access.refresh = Some(IssuedToken::new("R1", long_ago, Duration::ZERO));
        store.create(&expired_access).await.unwrap();

        let mut expired_refresh = TokenInfo::new("app");
        expired_refresh.access = Some(IssuedToken::new("A2", long_ago, Duration::ZERO));
        expired_refresh.refresh = Some(IssuedToken::new("R2", long_ago, Duration::from_secs(60)));
        store.create(&expired_refresh).await.unwrap();

        assert_eq!(
            manager.load_access_token("A1").await,
            Err(AuthError::ExpiredAccessToken)
        );
        // A never-expiring refresh token is still usable.
        assert!(manager.load_refresh_token("R1").await.is_ok());

        assert_eq!(
            manager.load_access_token("A2").await,
            Err(AuthError::ExpiredRefreshToken)
        );
        assert_eq!(
            manager.load_refresh_token("R2").await,
            Err(AuthError::ExpiredRefreshToken)
        );
        assert_eq!(
            manager.load_access_token("missing").await,
            Err(AuthError::InvalidAccessToken)
        );
    }

    #[tokio::test]
    async fn test_remove_tokens() {
        let (manager, _) = manager();
        assert_eq!(
            manager.remove_access_token("").await,
            Err(AuthError::InvalidAccessToken)
        );
        assert_eq!(
            manager.remove_refresh_token("").await,
            Err(AuthError::InvalidRefreshToken)
        );

        let info = password_grant(&manager).await;
        manager
            .remove_access_token(info.access_value().unwrap())
            .await
            .unwrap();
        assert_eq!(
            manager.load_access_token(info.access_value().unwrap()).await,
            Err(AuthError::InvalidAccessToken)
        );
        assert!(
            manager
                .load_refresh_token(info.refresh_value().unwrap())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_jwt_access_generator() {
        let store = Arc::new(MockTokenStore::default());
        let generator = Arc::new(JwtAccessGenerate::new(b"secret", HmacAlgorithm::HS256));
        let manager = Manager::new(ManagerConfig::default(), clients(), store)
            .with_access_generator(generator.clone());

        let info = password_grant(&manager).await;
        let claims = generator.parse(info.access_value().unwrap()).unwrap();
        assert_eq!(claims.aud, "app");
        assert_eq!(claims.sub.as_deref(), Some("alice"));
    }
}
