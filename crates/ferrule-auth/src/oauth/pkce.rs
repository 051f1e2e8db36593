//! PKCE (Proof Key for Code Exchange) implementation.
//!
//! Implements RFC 7636 with both the `plain` and `S256` methods.
//!
//! # Example
//!
//! ```
//! use ferrule_auth::oauth::pkce::{CodeChallengeMethod, s256_challenge};
//!
//! let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
//! let challenge = s256_challenge(verifier);
//! assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
//! assert!(CodeChallengeMethod::S256.validate(&challenge, verifier));
//! ```

use std::str::FromStr;

use base64::{
    Engine,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

/// Minimum `code_challenge` length accepted at the authorize endpoint.
pub const MIN_CHALLENGE_LEN: usize = 43;

/// Maximum `code_challenge` length accepted at the authorize endpoint.
pub const MAX_CHALLENGE_LEN: usize = 128;

// =============================================================================
// Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CodeChallengeMethod {
    /// The challenge is the verifier itself.
    #[default]
    #[serde(rename = "plain")]
    Plain,
    /// The challenge is `BASE64URL(SHA256(verifier))`.
    #[serde(rename = "S256")]
    S256,
}

impl CodeChallengeMethod {
    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }

    /// Checks a verifier against a stored challenge.
    ///
    /// For `S256` the challenge is accepted with or without base64 padding.
    #[must_use]
    pub fn validate(&self, challenge: &str, verifier: &str) -> bool {
        match self {
            Self::Plain => constant_time_eq(challenge, verifier),
            Self::S256 => {
                let digest = Sha256::digest(verifier.as_bytes());
                let padded = URL_SAFE.encode(digest);
                let unpadded = URL_SAFE_NO_PAD.encode(digest);
                constant_time_eq(challenge, &padded) || constant_time_eq(challenge, &unpadded)
            }
        }
    }
}

impl std::fmt::Display for CodeChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CodeChallengeMethod {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "S256" => Ok(Self::S256),
            other => Err(AuthError::unsupported_code_challenge_method(other)),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Computes the unpadded `S256` challenge for a verifier.
#[must_use]
pub fn s256_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generates a random 43 character verifier.
#[must_use]
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validates the length of a `code_challenge` received at the authorize
/// endpoint.
///
/// # Errors
///
/// Returns `AuthError::InvalidCodeChallengeLength` when the challenge is not
/// 43 to 128 characters long.
pub fn validate_challenge_length(challenge: &str) -> Result<(), AuthError> {
    let length = challenge.len();
    if (MIN_CHALLENGE_LEN..=MAX_CHALLENGE_LEN).contains(&length) {
        Ok(())
    } else {
        Err(AuthError::InvalidCodeChallengeLength { length })
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_rfc7636_appendix_b_test_vector() {
        assert_eq!(s256_challenge(RFC_VERIFIER), RFC_CHALLENGE);
        assert!(CodeChallengeMethod::S256.validate(RFC_CHALLENGE, RFC_VERIFIER));
    }

    #[test]
    fn test_s256_accepts_padded_challenge() {
        let padded = format!("{}=", RFC_CHALLENGE);
        assert!(CodeChallengeMethod::S256.validate(&padded, RFC_VERIFIER));
    }

    #[test]
    fn test_s256_rejects_wrong_verifier() {
        assert!(!CodeChallengeMethod::S256.validate(RFC_CHALLENGE, "verifier123"));
        assert!(!CodeChallengeMethod::S256.validate(RFC_CHALLENGE, RFC_CHALLENGE));
    }

    #[test]
    fn test_plain_is_string_equality() {
        assert!(CodeChallengeMethod::Plain.validate("verifier123", "verifier123"));
        assert!(!CodeChallengeMethod::Plain.validate("verifier123", "verifier124"));
        assert!(!CodeChallengeMethod::Plain.validate("verifier123", "verifier1234"));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("plain".parse::<CodeChallengeMethod>(), Ok(CodeChallengeMethod::Plain));
        assert_eq!("S256".parse::<CodeChallengeMethod>(), Ok(CodeChallengeMethod::S256));
        assert_eq!(
            "s256".parse::<CodeChallengeMethod>(),
            Err(AuthError::unsupported_code_challenge_method("s256"))
        );
        assert_eq!(CodeChallengeMethod::default(), CodeChallengeMethod::Plain);
    }

    #[test]
    fn test_method_serde() {
        let json = serde_json::to_string(&CodeChallengeMethod::S256).unwrap();
        assert_eq!(json, r#""S256""#);
        let method: CodeChallengeMethod = serde_json::from_str(r#""plain""#).unwrap();
        assert_eq!(method, CodeChallengeMethod::Plain);
    }

    #[test]
    fn test_challenge_length_bounds() {
        assert!(validate_challenge_length(&"a".repeat(43)).is_ok());
        assert!(validate_challenge_length(&"a".repeat(128)).is_ok());
        assert_eq!(
            validate_challenge_length(&"a".repeat(42)),
            Err(AuthError::InvalidCodeChallengeLength { length: 42 })
        );
        assert!(validate_challenge_length(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_generated_verifier_round_trips() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), 43);
        let challenge = s256_challenge(&verifier);
        assert!(CodeChallengeMethod::S256.validate(&challenge, &verifier));
        assert_ne!(generate_verifier(), verifier);
    }
}
