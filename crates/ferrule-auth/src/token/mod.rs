//! Token value generation.
//!
//! Generators mint the opaque strings handed to clients. They are stateless
//! and never touch storage.
//!
//! - [`AuthorizeGenerate`] - authorization codes
//! - [`AccessGenerate`] - opaque access and refresh tokens
//! - [`JwtAccessGenerate`] - HMAC-signed JWT access tokens

pub mod generate;
pub mod jwt;

use std::time::Duration;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::Client;

pub use generate::{AccessGenerate, AuthorizeGenerate};
pub use jwt::{HmacAlgorithm, JwtAccessClaims, JwtAccessGenerate};

/// Inputs available to a generator.
#[derive(Debug, Clone, Copy)]
pub struct GenerateBasic<'a> {
    /// Client the value is issued to.
    pub client: &'a Client,

    /// Resource owner, if any.
    pub user_id: Option<&'a str>,

    /// Issue time of the value.
    pub created_at: OffsetDateTime,

    /// Lifetime of the access token being issued. Zero for codes.
    pub access_exp: Duration,
}

/// Mints authorization codes.
pub trait AuthorizeGenerator: Send + Sync {
    /// Returns a new code.
    fn token(&self, data: &GenerateBasic<'_>) -> String;
}

/// Mints access tokens and, on request, refresh tokens.
pub trait AccessGenerator: Send + Sync {
    /// Returns a new access token and, when `generate_refresh` is set, a
    /// refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be produced (e.g. signing fails).
    fn token(
        &self,
        data: &GenerateBasic<'_>,
        generate_refresh: bool,
    ) -> AuthResult<(String, Option<String>)>;
}
