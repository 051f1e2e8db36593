//! Token record types.
//!
//! A [`TokenInfo`] describes one authorization grant. It can be looked up by
//! its authorization code, its access token or its refresh token; each of the
//! three is an [`IssuedToken`] carrying its own creation time and lifetime.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::oauth::pkce::CodeChallengeMethod;

/// One issued credential value together with its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    /// The opaque value handed to the client.
    pub value: String,

    /// When the value was minted.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Lifetime. Zero means the value never expires.
    #[serde(with = "humantime_serde")]
    pub expires_in: Duration,
}

impl IssuedToken {
    /// Creates a new issued value.
    #[must_use]
    pub fn new(value: impl Into<String>, created_at: OffsetDateTime, expires_in: Duration) -> Self {
        Self {
            value: value.into(),
            created_at,
            expires_in,
        }
    }

    /// Returns the expiry instant, or `None` if the value never expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        if self.expires_in.is_zero() {
            None
        } else {
            Some(self.created_at + self.expires_in)
        }
    }

    /// Returns `true` if the value had expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at().is_some_and(|at| at < now)
    }

    /// Returns `true` if the value has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

/// The lifecycle record of one authorization grant.
///
/// Created with a `code` by the authorize endpoint, or with an `access`
/// (and optional `refresh`) by a direct grant. The code is consumed exactly
/// once; access and refresh values are replaced on refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Client the grant was issued to.
    pub client_id: String,

    /// Resource owner, absent for client credentials grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Redirect URI the code was bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Granted scope (space-separated, may be empty).
    #[serde(default)]
    pub scope: String,

    /// PKCE challenge recorded at authorization time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// Method of `code_challenge`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<CodeChallengeMethod>,

    /// Access token lifetime granted with the code, applied on exchange.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde::option"
    )]
    pub granted_access_exp: Option<Duration>,

    /// Authorization code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<IssuedToken>,

    /// Access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<IssuedToken>,

    /// Refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<IssuedToken>,
}

impl TokenInfo {
    /// Creates an empty record for a client.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// The authorization code value, if any.
    #[must_use]
    pub fn code_value(&self) -> Option<&str> {
        self.code.as_ref().map(|t| t.value.as_str())
    }

    /// The access token value, if any.
    #[must_use]
    pub fn access_value(&self) -> Option<&str> {
        self.access.as_ref().map(|t| t.value.as_str())
    }

    /// The refresh token value, if any.
    #[must_use]
    pub fn refresh_value(&self) -> Option<&str> {
        self.refresh.as_ref().map(|t| t.value.as_str())
    }

    /// Access token lifetime in whole seconds, or 0 when there is none.
    #[must_use]
    pub fn access_expires_in_secs(&self) -> u64 {
        self.access.as_ref().map_or(0, |t| t.expires_in.as_secs())
    }

    /// Clears the refresh token, leaving a record that can no longer be
    /// refreshed.
    pub fn clear_refresh(&mut self) {
        self.refresh = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_lifetime_never_expires() {
        let created = OffsetDateTime::now_utc() - time::Duration::days(365);
        let token = IssuedToken::new("r", created, Duration::ZERO);
        assert_eq!(token.expires_at(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expiry() {
        let created = OffsetDateTime::now_utc() - time::Duration::seconds(10);
        let short = IssuedToken::new("a", created, Duration::from_secs(5));
        let long = IssuedToken::new("a", created, Duration::from_secs(60));

        assert!(short.is_expired());
        assert!(!long.is_expired());
        assert_eq!(long.expires_at(), Some(created + Duration::from_secs(60)));
    }

    #[test]
    fn test_values() {
        let now = OffsetDateTime::now_utc();
        let mut info = TokenInfo::new("client");
        assert_eq!(info.code_value(), None);
        assert_eq!(info.access_expires_in_secs(), 0);

        info.access = Some(IssuedToken::new("AT", now, Duration::from_secs(7200)));
        info.refresh = Some(IssuedToken::new("RT", now, Duration::ZERO));
        assert_eq!(info.access_value(), Some("AT"));
        assert_eq!(info.access_expires_in_secs(), 7200);

        info.clear_refresh();
        assert_eq!(info.refresh_value(), None);
    }

    #[test]
    fn test_serde_round_trip_keeps_optional_fields_absent() {
        let now = OffsetDateTime::now_utc().replace_nanosecond(0).unwrap();
        let mut info = TokenInfo::new("client");
        info.code = Some(IssuedToken::new("CODE", now, Duration::from_secs(600)));

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("access").is_none());
        assert!(json.get("user_id").is_none());
        assert_eq!(json["code"]["expires_in"], "10m");

        let back: TokenInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }
}
