//! Opaque code and token generators.
//!
//! Values are `BASE64URL(SHA256(uuid_v4 || client_id || user_id || created_at))`
//! without padding, upper-cased. The random UUID makes every value unique;
//! the mixed-in request data only adds entropy.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{AccessGenerator, AuthorizeGenerator, GenerateBasic};
use crate::AuthResult;

fn mint(data: &GenerateBasic<'_>, salt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(salt);
    hasher.update(data.client.id.as_bytes());
    hasher.update(data.user_id.unwrap_or_default().as_bytes());
    hasher.update(data.created_at.unix_timestamp_nanos().to_be_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize()).to_uppercase()
}

/// Default authorization code generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizeGenerate;

impl AuthorizeGenerator for AuthorizeGenerate {
    fn token(&self, data: &GenerateBasic<'_>) -> String {
        mint(data, b"code")
    }
}

/// Default opaque access/refresh token generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGenerate;

impl AccessGenerator for AccessGenerate {
    fn token(
        &self,
        data: &GenerateBasic<'_>,
        generate_refresh: bool,
    ) -> AuthResult<(String, Option<String>)> {
        let access = mint(data, b"access");
        let refresh = generate_refresh.then(|| mint(data, b"refresh"));
        Ok((access, refresh))
    }
}
