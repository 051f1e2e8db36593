//! Token storage trait.
//!
//! A [`TokenInfo`] record is indexed by up to three values: its
//! authorization code, its access token and its refresh token. Each index is
//! unique across all records.
//!
//! # Consistency
//!
//! Authorization codes are single-use. [`TokenStore::consume_by_code`] must
//! fetch and delete in one atomic step so that two concurrent redemptions of
//! the same code cannot both succeed. [`TokenStore::consume_by_refresh`]
//! gives the same guarantee for refresh tokens that are revoked on use.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::TokenInfo;

/// Storage operations for token records.
///
/// # Implementations
///
/// - `ferrule-auth-memory` - in-memory backend
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stores a record under every non-empty value it carries.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    async fn create(&self, info: &TokenInfo) -> AuthResult<()>;

    /// Removes the code index. Unknown codes are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove_by_code(&self, code: &str) -> AuthResult<()>;

    /// Removes the access token index. Unknown values are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove_by_access(&self, access: &str) -> AuthResult<()>;

    /// Removes the refresh token index. Unknown values are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove_by_refresh(&self, refresh: &str) -> AuthResult<()>;

    /// Finds a record by authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_by_code(&self, code: &str) -> AuthResult<Option<TokenInfo>>;

    /// Finds a record by access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_by_access(&self, access: &str) -> AuthResult<Option<TokenInfo>>;

    /// Finds a record by refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_by_refresh(&self, refresh: &str) -> AuthResult<Option<TokenInfo>>;

    /// Atomically fetches and deletes the record indexed by `code`.
    ///
    /// At most one caller may receive `Some` for a given code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume_by_code(&self, code: &str) -> AuthResult<Option<TokenInfo>>;

    /// Atomically fetches the record indexed by `refresh` and removes that
    /// index, as [`remove_by_refresh`](Self::remove_by_refresh) would.
    ///
    /// Returns the record as it was before. At most one caller may receive
    /// `Some` for a given refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume_by_refresh(&self, refresh: &str) -> AuthResult<Option<TokenInfo>>;
}
