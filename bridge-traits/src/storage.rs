//! Storage Abstractions
//!
//! Two key-value ports with different lifetimes back the authorization core:
//! a durable store for issued access tokens and a session store for in-flight
//! OAuth artifacts. Splitting the ports keeps the state machine testable
//! without any host environment and makes the persistence contract explicit
//! instead of relying on a host-global storage object.

use async_trait::async_trait;

use crate::error::Result;

/// Durable key-value storage.
///
/// Values written here must survive an application restart. Hosts map this
/// onto whatever long-lived storage they have:
/// - Desktop: SQLite or a config file
/// - Browser: `localStorage`
/// - Tests: an in-memory map
///
/// # Security
///
/// The core stores bearer tokens here. Implementations must never log stored
/// values and should encrypt at rest where the platform allows it.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::DurableStore;
///
/// async fn remember(store: &dyn DurableStore) -> Result<()> {
///     store.set("mastodon_token", "opaque-value").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Store a value, overwriting any previous value for the key.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a value.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a value. Succeeds even if the key doesn't exist.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists without retrieving it.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Session-scoped key-value storage.
///
/// Values written here live at most as long as the current session: a browser
/// tab, a desktop process, a test run. The core keeps pending OAuth state
/// nonces and credentials here so an abandoned redirect round-trip cannot
/// leak into a later session.
///
/// The contract is the same shape as [`DurableStore`]; only the lifetime
/// differs. The two are distinct traits so a host cannot accidentally satisfy
/// both with one long-lived object.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a value, overwriting any previous value for the key.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a value.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a value. Succeeds even if the key doesn't exist.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists without retrieving it.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
