//! Authorization server configuration.
//!
//! [`OAuthConfig`] is built once at startup and moved into the
//! [`Manager`](crate::oauth::Manager) and [`Server`](crate::oauth::Server).
//! Nothing here is process-global.
//!
//! # Example (TOML)
//!
//! ```toml
//! [oauth.manager]
//! authorize_code_exp = "10m"
//!
//! [oauth.manager.password]
//! access_token_exp = "2h"
//! refresh_token_exp = "7d"
//! is_generate_refresh = true
//!
//! [oauth.server]
//! force_pkce = true
//! allowed_grant_types = ["authorization_code", "refresh_token"]
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::oauth::pkce::CodeChallengeMethod;
use crate::types::{GrantType, ResponseType};

// =============================================================================
// Root
// =============================================================================

/// Root OAuth 2.0 configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Token lifetimes and refresh policy.
    pub manager: ManagerConfig,

    /// Request handling policy.
    pub server: ServerConfig,
}

impl OAuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first problem found in either section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.manager.validate()?;
        self.server.validate()
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Per-grant token policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GrantConfig {
    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_exp: Duration,

    /// Refresh token lifetime. Zero means the refresh token never expires.
    #[serde(with = "humantime_serde")]
    pub refresh_token_exp: Duration,

    /// Issue a refresh token alongside the access token.
    pub is_generate_refresh: bool,
}

impl GrantConfig {
    /// A policy issuing both an access and a refresh token.
    #[must_use]
    pub const fn with_refresh(access_token_exp: Duration, refresh_token_exp: Duration) -> Self {
        Self {
            access_token_exp,
            refresh_token_exp,
            is_generate_refresh: true,
        }
    }

    /// A policy issuing an access token only.
    #[must_use]
    pub const fn access_only(access_token_exp: Duration) -> Self {
        Self {
            access_token_exp,
            refresh_token_exp: Duration::ZERO,
            is_generate_refresh: false,
        }
    }
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self::with_refresh(HOUR * 2, HOUR * 72)
    }
}

/// Refresh token rotation policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// New access token lifetime. `None` keeps the previous lifetime.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde::option"
    )]
    pub access_token_exp: Option<Duration>,

    /// New refresh token lifetime. `None` keeps the previous lifetime.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde::option"
    )]
    pub refresh_token_exp: Option<Duration>,

    /// Issue a new refresh token on every refresh.
    pub is_generate_refresh: bool,

    /// Revoke the previous access token after a refresh.
    pub is_remove_access: bool,

    /// Revoke the previous refresh token after it was rotated.
    pub is_remove_refreshing: bool,

    /// Restart the refresh token lifetime on every refresh.
    pub is_reset_refresh_time: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            access_token_exp: None,
            refresh_token_exp: None,
            is_generate_refresh: true,
            is_remove_access: true,
            is_remove_refreshing: true,
            is_reset_refresh_time: false,
        }
    }
}

/// Token lifetimes for every grant plus the refresh policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorize_code_exp: Duration,

    /// Policy for codes exchanged at the token endpoint.
    pub authorization_code: GrantConfig,

    /// Policy for tokens issued by `response_type=token`.
    pub implicit: GrantConfig,

    /// Policy for the password grant.
    pub password: GrantConfig,

    /// Policy for the client credentials grant.
    pub client_credentials: GrantConfig,

    /// Policy for the refresh token grant.
    pub refresh: RefreshConfig,
}

const HOUR: Duration = Duration::from_secs(3600);

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            authorize_code_exp: Duration::from_secs(600),
            authorization_code: GrantConfig::with_refresh(HOUR * 2, HOUR * 72),
            implicit: GrantConfig::access_only(HOUR),
            password: GrantConfig::with_refresh(HOUR * 2, HOUR * 24 * 7),
            client_credentials: GrantConfig::access_only(HOUR * 2),
            refresh: RefreshConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Returns the policy of a grant.
    ///
    /// `RefreshToken` has no [`GrantConfig`] of its own; see
    /// [`ManagerConfig::refresh`].
    #[must_use]
    pub fn grant(&self, grant_type: GrantType) -> Option<&GrantConfig> {
        match grant_type {
            GrantType::AuthorizationCode => Some(&self.authorization_code),
            GrantType::Implicit => Some(&self.implicit),
            GrantType::Password => Some(&self.password),
            GrantType::ClientCredentials => Some(&self.client_credentials),
            GrantType::RefreshToken => None,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the code lifetime or any
    /// grant's access token lifetime is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.authorize_code_exp.is_zero() {
            return Err(ConfigError::InvalidValue(
                "authorize_code_exp must be > 0".to_string(),
            ));
        }

        for (name, grant) in [
            ("authorization_code", &self.authorization_code),
            ("implicit", &self.implicit),
            ("password", &self.password),
            ("client_credentials", &self.client_credentials),
        ] {
            if grant.access_token_exp.is_zero() {
                return Err(ConfigError::InvalidValue(format!(
                    "{}.access_token_exp must be > 0",
                    name
                )));
            }
        }

        if self.refresh.access_token_exp.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidValue(
                "refresh.access_token_exp must be > 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Server
// =============================================================================

/// Where the token endpoint reads client credentials from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientCredentialsSource {
    /// `client_id` and `client_secret` form fields.
    Form,
    /// HTTP Basic `Authorization` header.
    Basic,
    /// The Basic header if present, else the form fields.
    #[default]
    FormOrBasic,
}

/// Request handling policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `token_type` reported in token responses.
    pub token_type: String,

    /// Accept token requests sent with GET.
    pub allow_get_access_request: bool,

    /// Response types accepted at the authorize endpoint.
    pub allowed_response_types: Vec<ResponseType>,

    /// Grant types accepted at the token endpoint.
    pub allowed_grant_types: Vec<GrantType>,

    /// PKCE methods accepted at the authorize endpoint.
    pub allowed_code_challenge_methods: Vec<CodeChallengeMethod>,

    /// Require PKCE on every code flow.
    pub force_pkce: bool,

    /// Where client credentials are read from.
    pub client_credentials_source: ClientCredentialsSource,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            token_type: "Bearer".to_string(),
            allow_get_access_request: false,
            allowed_response_types: vec![ResponseType::Code, ResponseType::Token],
            allowed_grant_types: vec![
                GrantType::AuthorizationCode,
                GrantType::Password,
                GrantType::ClientCredentials,
                GrantType::RefreshToken,
            ],
            allowed_code_challenge_methods: vec![
                CodeChallengeMethod::Plain,
                CodeChallengeMethod::S256,
            ],
            force_pkce: false,
            client_credentials_source: ClientCredentialsSource::default(),
        }
    }
}

impl ServerConfig {
    /// Returns `true` if the response type is allowed.
    #[must_use]
    pub fn allows_response_type(&self, response_type: ResponseType) -> bool {
        self.allowed_response_types.contains(&response_type)
    }

    /// Returns `true` if the grant type is allowed.
    #[must_use]
    pub fn allows_grant_type(&self, grant_type: GrantType) -> bool {
        self.allowed_grant_types.contains(&grant_type)
    }

    /// Returns `true` if the PKCE method is allowed.
    #[must_use]
    pub fn allows_code_challenge_method(&self, method: CodeChallengeMethod) -> bool {
        self.allowed_code_challenge_methods.contains(&method)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `token_type` is empty
    /// - `implicit` is listed as a token endpoint grant
    /// - PKCE is forced but no challenge method is allowed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "token_type cannot be empty".to_string(),
            ));
        }

        if self.allowed_grant_types.contains(&GrantType::Implicit) {
            return Err(ConfigError::InvalidValue(
                "Invalid grant type: 'implicit'. Allow the 'token' response type instead"
                    .to_string(),
            ));
        }

        if self.force_pkce && self.allowed_code_challenge_methods.is_empty() {
            return Err(ConfigError::InvalidValue(
                "force_pkce requires at least one allowed code challenge method".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}
