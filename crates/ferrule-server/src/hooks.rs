//! Resource owner hooks installed by the standalone server.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::HeaderName;
use ferrule_auth::AuthResult;
use ferrule_auth::oauth::{OAuthRequest, PasswordAuthorizationHandler, UserAuthorizationHandler};
use subtle::ConstantTimeEq;

use crate::config::UserConfig;

/// Header carrying the authenticated user in development setups.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// Trusts the `X-User-Id` request header as the authenticated user.
///
/// Anyone can set this header. Only enable it behind a proxy that strips it
/// or on a developer machine.
#[derive(Debug, Default)]
pub struct HeaderUserAuthorization;

#[async_trait]
impl UserAuthorizationHandler for HeaderUserAuthorization {
    async fn authorize_user(&self, req: &OAuthRequest) -> AuthResult<Option<String>> {
        let user_id = req
            .headers
            .get(&USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Ok(user_id)
    }
}

/// Checks password grant credentials against the configured users.
#[derive(Debug, Default)]
pub struct ConfigPasswordAuthorization {
    // username -> (password, user id)
    users: HashMap<String, (String, String)>,
}

impl ConfigPasswordAuthorization {
    pub fn new(users: &[UserConfig]) -> Self {
        let users = users
            .iter()
            .map(|u| (u.username.clone(), (u.password.clone(), u.id.clone())))
            .collect();
        Self { users }
    }
}

#[async_trait]
impl PasswordAuthorizationHandler for ConfigPasswordAuthorization {
    async fn authorize_password(
        &self,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> AuthResult<Option<String>> {
        let Some((expected, user_id)) = self.users.get(username) else {
            tracing::debug!(client_id, "Password grant for unknown user");
            return Ok(None);
        };

        if bool::from(expected.as_bytes().ct_eq(password.as_bytes())) {
            Ok(Some(user_id.clone()))
        } else {
            tracing::debug!(client_id, "Password grant with wrong password");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method};

    #[tokio::test]
    async fn test_header_user() {
        let hook = HeaderUserAuthorization;

        let req = OAuthRequest::new(Method::GET);
        assert_eq!(hook.authorize_user(&req).await.unwrap(), None);

        let req = req.with_header(USER_ID_HEADER, HeaderValue::from_static(" user-7 "));
        assert_eq!(
            hook.authorize_user(&req).await.unwrap().as_deref(),
            Some("user-7")
        );
    }

    #[tokio::test]
    async fn test_config_password() {
        let hook = ConfigPasswordAuthorization::new(&[UserConfig {
            id: "user-1".into(),
            username: "alice".into(),
            password: "wonderland".into(),
        }]);

        assert_eq!(
            hook.authorize_password("app", "alice", "wonderland")
                .await
                .unwrap()
                .as_deref(),
            Some("user-1")
        );
        assert!(hook
            .authorize_password("app", "alice", "looking-glass")
            .await
            .unwrap()
            .is_none());
        assert!(hook
            .authorize_password("app", "bob", "wonderland")
            .await
            .unwrap()
            .is_none());
    }
}
