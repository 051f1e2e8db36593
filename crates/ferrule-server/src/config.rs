//! Server configuration loaded from a TOML file.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 9000
//! trust_user_header = true
//!
//! [logging]
//! level = "debug"
//!
//! [oauth.manager.authorization_code]
//! access_token_exp = "30m"
//!
//! [[clients]]
//! id = "web"
//! secret = "web-secret"
//! domain = "https://web.example.com"
//!
//! [[users]]
//! id = "user-1"
//! username = "alice"
//! password = "wonderland"
//! ```

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use anyhow::{Context, bail};
use ferrule_auth::{Client, OAuthConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Token lifetimes and request policy.
    #[serde(default)]
    pub oauth: OAuthConfig,
    /// Clients registered at startup.
    #[serde(default)]
    pub clients: Vec<Client>,
    /// Resource owners accepted by the password grant.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be > 0");
        }
        self.addr()?;

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            bail!("logging.level must be one of {valid_levels:?}");
        }

        self.oauth
            .validate()
            .map_err(|e| anyhow::anyhow!("oauth config error: {e}"))?;

        let mut ids = HashSet::new();
        for client in &self.clients {
            if client.id.is_empty() {
                bail!("clients[].id must not be empty");
            }
            if !ids.insert(client.id.as_str()) {
                bail!("duplicate client id '{}'", client.id);
            }
            url::Url::parse(&client.domain)
                .with_context(|| format!("client '{}' has an invalid domain", client.id))?;
        }

        let mut usernames = HashSet::new();
        for user in &self.users {
            if user.username.is_empty() || user.id.is_empty() {
                bail!("users[] need a non-empty id and username");
            }
            if !usernames.insert(user.username.as_str()) {
                bail!("duplicate username '{}'", user.username);
            }
        }

        Ok(())
    }

    /// Listen address. `server.host` must be an IP address.
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        let host: IpAddr = self.server.host.parse().with_context(|| {
            format!(
                "server.host must be an IP address (e.g. 127.0.0.1), got '{}'",
                self.server.host
            )
        })?;
        Ok(SocketAddr::from((host, self.server.port)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login page for authorize requests without an authenticated user.
    #[serde(default)]
    pub login_uri: Option<String>,
    /// Accept the `X-User-Id` header as the authenticated user on the
    /// authorize endpoint. Development only.
    #[serde(default)]
    pub trust_user_header: bool,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    9096
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            login_uri: None,
            trust_user_header: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// A resource owner for the password grant.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// User id recorded on issued tokens.
    pub id: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserConfig")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Reads and validates a configuration file.
///
/// A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let path = path.as_ref();
    let cfg = if path.exists() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str::<AppConfig>(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?
    } else {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        AppConfig::default()
    };
    cfg.validate()?;
    Ok(cfg)
}
