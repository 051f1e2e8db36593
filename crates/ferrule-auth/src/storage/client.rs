//! Client storage trait and the default in-memory registry.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::Client;

// =============================================================================
// Client Store Trait
// =============================================================================

/// Storage operations for registered OAuth 2.0 clients.
///
/// # Example
///
/// ```ignore
/// use ferrule_auth::storage::ClientStore;
///
/// async fn example(store: &impl ClientStore) -> ferrule_auth::AuthResult<()> {
///     if let Some(client) = store.get_by_id("my-app").await? {
///         println!("redirects under {}", client.domain);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Finds a client by id.
    ///
    /// Returns `None` if the client doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_by_id(&self, id: &str) -> AuthResult<Option<Client>>;

    /// Registers or replaces a client under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn set(&self, id: &str, client: Client) -> AuthResult<()>;

    /// Removes a client. Removing an unknown id is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, id: &str) -> AuthResult<()>;
}

// =============================================================================
// In-Memory Client Store
// =============================================================================

/// A client registry kept in a read-write locked map.
#[derive(Debug, Default)]
pub struct MemoryClientStore {
    clients: RwLock<HashMap<String, Client>>,
}

impl MemoryClientStore {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with clients, keyed by their ids.
    #[must_use]
    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let clients = clients
            .into_iter()
            .map(|client| (client.id.clone(), client))
            .collect();
        Self {
            clients: RwLock::new(clients),
        }
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Returns `true` if no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> AuthError {
    AuthError::storage("client store lock poisoned")
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn get_by_id(&self, id: &str) -> AuthResult<Option<Client>> {
        let clients = self.clients.read().map_err(|_| poisoned())?;
        Ok(clients.get(id).cloned())
    }

    async fn set(&self, id: &str, client: Client) -> AuthResult<()> {
        let mut clients = self.clients.write().map_err(|_| poisoned())?;
        clients.insert(id.to_string(), client);
        Ok(())
    }

    async fn delete(&self, id: &str) -> AuthResult<()> {
        let mut clients = self.clients.write().map_err(|_| poisoned())?;
        clients.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryClientStore::new();
        assert!(store.is_empty());
        assert!(store.get_by_id("app").await.unwrap().is_none());

        let client = Client::new("app", "https://app.example.com").with_secret("s3cret");
        store.set("app", client.clone()).await.unwrap();
        assert_eq!(store.get_by_id("app").await.unwrap(), Some(client));
        assert_eq!(store.len(), 1);

        store.delete("app").await.unwrap();
        assert!(store.get_by_id("app").await.unwrap().is_none());

        // Deleting again is fine.
        store.delete("app").await.unwrap();
    }

    #[tokio::test]
    async fn test_seeded() {
        let store = MemoryClientStore::with_clients([
            Client::new("a", "https://a.example.com"),
            Client::new("b", "https://b.example.com"),
        ]);
        assert_eq!(store.len(), 2);
        let b = store.get_by_id("b").await.unwrap().unwrap();
        assert_eq!(b.domain, "https://b.example.com");
    }
}
