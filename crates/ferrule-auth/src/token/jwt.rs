//! JWT access token generator.
//!
//! Issues HMAC-signed JWTs whose claims bind the token to its client
//! (`aud`) and resource owner (`sub`). Refresh tokens stay opaque.
//!
//! # Example
//!
//! ```ignore
//! use ferrule_auth::token::{HmacAlgorithm, JwtAccessGenerate};
//!
//! let generator = JwtAccessGenerate::new(b"00000000", HmacAlgorithm::HS512)
//!     .with_kid("2024-01");
//! let manager = Manager::new(config, client_store, token_store)
//!     .with_access_generator(Arc::new(generator));
//! ```

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{AccessGenerator, GenerateBasic};
use crate::AuthResult;
use crate::error::AuthError;

// ============================================================================
// Algorithm
// ============================================================================

/// HMAC signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HmacAlgorithm {
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    #[default]
    HS512,
}

impl HmacAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }
}

impl fmt::Display for HmacAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims carried by a JWT access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtAccessClaims {
    /// Client id.
    pub aud: String,

    /// Resource owner id. Absent for client credentials tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiry (Unix seconds). Absent for tokens that never expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issue time (Unix seconds).
    pub iat: i64,

    /// Unique token id.
    pub jti: String,
}

// ============================================================================
// Generator
// ============================================================================

/// Access generator producing signed JWTs.
pub struct JwtAccessGenerate {
    algorithm: HmacAlgorithm,
    kid: Option<String>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtAccessGenerate {
    /// Creates a generator signing with a shared secret.
    #[must_use]
    pub fn new(secret: &[u8], algorithm: HmacAlgorithm) -> Self {
        Self {
            algorithm,
            kid: None,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sets the `kid` header.
    #[must_use]
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HmacAlgorithm {
        self.algorithm
    }

    /// Verifies a token produced by this generator and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ExpiredAccessToken` for an expired token and
    /// `AuthError::InvalidAccessToken` for any other verification failure.
    pub fn parse(&self, token: &str) -> AuthResult<JwtAccessClaims> {
        let mut validation = Validation::new(self.algorithm.to_jwt_algorithm());
        validation.validate_aud = false; // Audience checked by the caller
        validation.leeway = 0;
        validation.set_required_spec_claims::<&str>(&[]);

        decode::<JwtAccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredAccessToken,
                _ => AuthError::InvalidAccessToken,
            })
    }
}

impl fmt::Debug for JwtAccessGenerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAccessGenerate")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl AccessGenerator for JwtAccessGenerate {
    fn token(
        &self,
        data: &GenerateBasic<'_>,
        generate_refresh: bool,
    ) -> AuthResult<(String, Option<String>)> {
        let iat = data.created_at.unix_timestamp();
        let exp = (!data.access_exp.is_zero())
            .then(|| (data.created_at + data.access_exp).unix_timestamp());

        let claims = JwtAccessClaims {
            aud: data.client.id.clone(),
            sub: data.user_id.map(str::to_string),
            exp,
            iat,
            jti: Uuid::new_v4().to_string(),
        };

        let mut header = Header::new(self.algorithm.to_jwt_algorithm());
        header.kid.clone_from(&self.kid);

        let access = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("failed to sign access token: {e}")))?;

        let refresh = generate_refresh.then(|| {
            let mut hasher = Sha256::new();
            hasher.update(access.as_bytes());
            hasher.update(Uuid::new_v4().as_bytes());
            URL_SAFE_NO_PAD.encode(hasher.finalize()).to_uppercase()
        });

        Ok((access, refresh))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::OffsetDateTime;

    use super::*;
    use crate::types::Client;

    fn generate(
        generator: &JwtAccessGenerate,
        created_at: OffsetDateTime,
        access_exp: Duration,
    ) -> (String, Option<String>) {
        let client = Client::new("app", "https://app.example.com");
        let data = GenerateBasic {
            client: &client,
            user_id: Some("alice"),
            created_at,
            access_exp,
        };
        generator.token(&data, true).unwrap()
    }

    #[test]
    fn test_claims_round_trip() {
        let generator = JwtAccessGenerate::new(b"test-secret", HmacAlgorithm::HS256);
        let now = OffsetDateTime::now_utc();
        let (access, refresh) = generate(&generator, now, Duration::from_secs(3600));

        assert_eq!(access.split('.').count(), 3);
        assert!(refresh.is_some());

        let claims = generator.parse(&access).unwrap();
        assert_eq!(claims.aud, "app");
        assert_eq!(claims.sub.as_deref(), Some("alice"));
        assert_eq!(claims.iat, now.unix_timestamp());
        assert_eq!(claims.exp, Some(now.unix_timestamp() + 3600));
    }

    #[test]
    fn test_kid_header() {
        let generator = JwtAccessGenerate::new(b"test-secret", HmacAlgorithm::HS512).with_kid("k1");
        let (access, _) = generate(&generator, OffsetDateTime::now_utc(), Duration::from_secs(60));

        let header = jsonwebtoken::decode_header(&access).unwrap();
        assert_eq!(header.kid.as_deref(), Some("k1"));
        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[test]
    fn test_expired_token() {
        let generator = JwtAccessGenerate::new(b"test-secret", HmacAlgorithm::HS384);
        let long_ago = OffsetDateTime::now_utc() - time::Duration::hours(2);
        let (access, _) = generate(&generator, long_ago, Duration::from_secs(60));

        assert_eq!(generator.parse(&access), Err(AuthError::ExpiredAccessToken));
    }

    #[test]
    fn test_zero_lifetime_has_no_exp() {
        let generator = JwtAccessGenerate::new(b"test-secret", HmacAlgorithm::HS256);
        let (access, _) = generate(&generator, OffsetDateTime::now_utc(), Duration::ZERO);
        assert_eq!(generator.parse(&access).unwrap().exp, None);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let signer = JwtAccessGenerate::new(b"secret-a", HmacAlgorithm::HS256);
        let verifier = JwtAccessGenerate::new(b"secret-b", HmacAlgorithm::HS256);
        let (access, _) = generate(&signer, OffsetDateTime::now_utc(), Duration::from_secs(60));

        assert_eq!(verifier.parse(&access), Err(AuthError::InvalidAccessToken));
        assert_eq!(verifier.parse("not-a-jwt"), Err(AuthError::InvalidAccessToken));
    }
}
