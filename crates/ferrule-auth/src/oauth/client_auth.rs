//! Client checks: redirect URI binding and secret verification.

use subtle::ConstantTimeEq;
use url::Url;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::authorize::OOB_REDIRECT_URI;
use crate::types::Client;

// =============================================================================
// Redirect URI
// =============================================================================

/// Decides whether a redirect URI belongs to a client.
pub trait RedirectUriValidator: Send + Sync {
    /// Validates `redirect_uri` against the client's registered `domain`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRedirectUri` if the URI is not acceptable.
    fn validate(&self, domain: &str, redirect_uri: &str) -> AuthResult<()>;
}

/// Accepts redirect URIs on the client's host or one of its subdomains.
///
/// Scheme and port must match the registered domain. The out-of-band URI is
/// accepted for every client.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainRedirectValidator;

impl RedirectUriValidator for DomainRedirectValidator {
    fn validate(&self, domain: &str, redirect_uri: &str) -> AuthResult<()> {
        if redirect_uri == OOB_REDIRECT_URI {
            return Ok(());
        }

        let base = Url::parse(domain).map_err(|_| AuthError::InvalidRedirectUri)?;
        let target = Url::parse(redirect_uri).map_err(|_| AuthError::InvalidRedirectUri)?;

        let (Some(base_host), Some(target_host)) = (base.host_str(), target.host_str()) else {
            return Err(AuthError::InvalidRedirectUri);
        };

        let host_ok = target_host.eq_ignore_ascii_case(base_host)
            || target_host
                .to_ascii_lowercase()
                .ends_with(&format!(".{}", base_host.to_ascii_lowercase()));

        if host_ok
            && base.scheme() == target.scheme()
            && base.port_or_known_default() == target.port_or_known_default()
            && target.fragment().is_none()
        {
            Ok(())
        } else {
            Err(AuthError::InvalidRedirectUri)
        }
    }
}

// =============================================================================
// Client Secret
// =============================================================================

/// Verifies a presented client secret, e.g. against a stored hash.
pub trait ClientSecretVerifier: Send + Sync {
    /// Returns `true` if `secret` authenticates `client`.
    fn verify(&self, client: &Client, secret: &str) -> bool;
}

/// Compares plain-text secrets in constant time.
///
/// Public clients (no secret) pass regardless of what was presented.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSecretVerifier;

impl ClientSecretVerifier for PlainSecretVerifier {
    fn verify(&self, client: &Client, secret: &str) -> bool {
        match client.secret.as_deref() {
            None | Some("") => true,
            Some(expected) => expected.as_bytes().ct_eq(secret.as_bytes()).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "https://app.example.com";

    #[test]
    fn test_same_host() {
        let v = DomainRedirectValidator;
        assert!(v.validate(DOMAIN, "https://app.example.com/cb").is_ok());
        assert!(v.validate(DOMAIN, "https://APP.example.com/cb?x=1").is_ok());
    }

    #[test]
    fn test_subdomain() {
        let v = DomainRedirectValidator;
        assert!(v.validate(DOMAIN, "https://login.app.example.com/cb").is_ok());
    }

    #[test]
    fn test_lookalike_host_rejected() {
        let v = DomainRedirectValidator;
        assert_eq!(
            v.validate(DOMAIN, "https://evilapp.example.com/cb"),
            Err(AuthError::InvalidRedirectUri)
        );
        assert!(v.validate(DOMAIN, "https://app.example.com.evil.io/cb").is_err());
    }

    #[test]
    fn test_scheme_and_port_must_match() {
        let v = DomainRedirectValidator;
        assert!(v.validate(DOMAIN, "http://app.example.com/cb").is_err());
        assert!(v.validate(DOMAIN, "https://app.example.com:8443/cb").is_err());
        assert!(v.validate(DOMAIN, "https://app.example.com:443/cb").is_ok());
        assert!(
            v.validate("http://localhost:3000", "http://localhost:3000/cb")
                .is_ok()
        );
    }

    #[test]
    fn test_fragment_and_garbage_rejected() {
        let v = DomainRedirectValidator;
        assert!(v.validate(DOMAIN, "https://app.example.com/cb#frag").is_err());
        assert!(v.validate(DOMAIN, "not a url").is_err());
        assert!(v.validate("not a url", "https://app.example.com/cb").is_err());
    }

    #[test]
    fn test_oob_always_allowed() {
        assert!(DomainRedirectValidator.validate(DOMAIN, OOB_REDIRECT_URI).is_ok());
    }

    #[test]
    fn test_plain_secret_verifier() {
        let v = PlainSecretVerifier;
        let confidential = Client::new("app", DOMAIN).with_secret("s3cret");
        assert!(v.verify(&confidential, "s3cret"));
        assert!(!v.verify(&confidential, "s3cre"));
        assert!(!v.verify(&confidential, ""));

        let public = Client::new("spa", DOMAIN);
        assert!(v.verify(&public, ""));
        assert!(v.verify(&public, "anything"));
    }
}
