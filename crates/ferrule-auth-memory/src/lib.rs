//! In-memory token store for the ferrule authorization server.
//!
//! Records live in a single map keyed by an internal id, with one index per
//! token kind (code, access, refresh). All state sits behind one
//! `tokio::sync::RwLock`, so [`TokenStore::consume_by_code`] and
//! [`TokenStore::consume_by_refresh`] are true compare-and-delete.
//!
//! Nothing is persisted and expired records are not swept; they are
//! rejected when loaded and dropped once every value they carry is removed.
//!
//! # Example
//!
//! ```ignore
//! use ferrule_auth::Manager;
//! use ferrule_auth_memory::MemoryTokenStore;
//!
//! let manager = Manager::new(config, client_store, Arc::new(MemoryTokenStore::new()));
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use ferrule_auth::{AuthError, AuthResult, TokenInfo, TokenStore};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Token kinds a record is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Code,
    Access,
    Refresh,
}

impl TokenKind {
    const ALL: [TokenKind; 3] = [TokenKind::Code, TokenKind::Access, TokenKind::Refresh];

    fn value(self, info: &TokenInfo) -> Option<&str> {
        let value = match self {
            Self::Code => info.code_value(),
            Self::Access => info.access_value(),
            Self::Refresh => info.refresh_value(),
        };
        value.filter(|v| !v.is_empty())
    }

    fn clear(self, info: &mut TokenInfo) {
        match self {
            Self::Code => info.code = None,
            Self::Access => info.access = None,
            Self::Refresh => info.refresh = None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<Uuid, TokenInfo>,
    codes: HashMap<String, Uuid>,
    access: HashMap<String, Uuid>,
    refresh: HashMap<String, Uuid>,
}

impl Inner {
    fn index(&self, kind: TokenKind) -> &HashMap<String, Uuid> {
        match kind {
            TokenKind::Code => &self.codes,
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn index_mut(&mut self, kind: TokenKind) -> &mut HashMap<String, Uuid> {
        match kind {
            TokenKind::Code => &mut self.codes,
            TokenKind::Access => &mut self.access,
            TokenKind::Refresh => &mut self.refresh,
        }
    }

    fn get(&self, kind: TokenKind, value: &str) -> Option<TokenInfo> {
        self.index(kind)
            .get(value)
            .and_then(|id| self.records.get(id))
            .cloned()
    }

    /// Drops one index entry and the matching field of its record. Returns
    /// the record as it was before.
    fn remove(&mut self, kind: TokenKind, value: &str) -> Option<TokenInfo> {
        let id = self.index_mut(kind).remove(value)?;
        let record = self.records.get_mut(&id)?;
        let before = record.clone();

        kind.clear(record);
        if TokenKind::ALL.iter().all(|k| k.value(record).is_none()) {
            self.records.remove(&id);
        }
        Some(before)
    }
}

/// In-memory [`TokenStore`].
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Inner>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Returns `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create(&self, info: &TokenInfo) -> AuthResult<()> {
        let mut inner = self.inner.write().await;

        for kind in TokenKind::ALL {
            if let Some(value) = kind.value(info)
                && inner.index(kind).contains_key(value)
            {
                return Err(AuthError::storage(format!(
                    "Duplicate {:?} token value",
                    kind
                )));
            }
        }

        let id = Uuid::new_v4();
        for kind in TokenKind::ALL {
            if let Some(value) = kind.value(info) {
                inner.index_mut(kind).insert(value.to_string(), id);
            }
        }
        inner.records.insert(id, info.clone());

        tracing::trace!(client_id = %info.client_id, records = inner.records.len(), "Token record stored");
        Ok(())
    }

    async fn remove_by_code(&self, code: &str) -> AuthResult<()> {
        self.inner.write().await.remove(TokenKind::Code, code);
        Ok(())
    }

    async fn remove_by_access(&self, access: &str) -> AuthResult<()> {
        self.inner.write().await.remove(TokenKind::Access, access);
        Ok(())
    }

    async fn remove_by_refresh(&self, refresh: &str) -> AuthResult<()> {
        self.inner.write().await.remove(TokenKind::Refresh, refresh);
        Ok(())
    }

    async fn get_by_code(&self, code: &str) -> AuthResult<Option<TokenInfo>> {
        Ok(self.inner.read().await.get(TokenKind::Code, code))
    }

    async fn get_by_access(&self, access: &str) -> AuthResult<Option<TokenInfo>> {
        Ok(self.inner.read().await.get(TokenKind::Access, access))
    }

    async fn get_by_refresh(&self, refresh: &str) -> AuthResult<Option<TokenInfo>> {
        Ok(self.inner.read().await.get(TokenKind::Refresh, refresh))
    }

    async fn consume_by_code(&self, code: &str) -> AuthResult<Option<TokenInfo>> {
        Ok(self.inner.write().await.remove(TokenKind::Code, code))
    }

    async fn consume_by_refresh(&self, refresh: &str) -> AuthResult<Option<TokenInfo>> {
        Ok(self.inner.write().await.remove(TokenKind::Refresh, refresh))
    }
}
