//! Client-side key-value storage.
//!
//! The storefront keeps state in two namespaces with different lifetimes:
//!
//! - **short-lived** - cleared when the browsing context ends; holds the cart
//! - **durable** - survives restarts; holds the bearer token and cached profile
//!
//! Business logic never touches a [`KeyValueStore`] directly. It goes through a
//! typed [`Repository`], which treats missing or malformed values as absent so
//! that corrupt storage can never crash a page.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Fixed storage keys.
pub mod keys {
    /// Short-lived namespace: serialized cart lines.
    pub const CART: &str = "cart";

    /// Durable namespace: bearer token.
    pub const TOKEN: &str = "token";

    /// Durable namespace: cached user profile.
    pub const USER: &str = "user";
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded.
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A string-to-string store with browser-storage semantics.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Read a value. `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Typed access to one key of a [`KeyValueStore`].
pub struct Repository<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").field("key", &self.key).finish()
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Bind a repository to `key` in `store`.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    /// The storage key this repository owns.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// Load the stored value.
    ///
    /// Absent, unreadable and unparseable values all come back as `None`;
    /// the latter two are logged.
    #[must_use]
    pub fn load(&self) -> Option<T> {
        let raw = match self.store.get(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = self.key, error = %e, "failed to read stored value");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = self.key, error = %e, "discarding malformed stored value");
                None
            }
        }
    }

    /// Serialize and store `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the backend write fails.
    pub fn save(&self, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(self.key, &raw)
    }

    /// Delete the stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(self.key)
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Load the stored value, falling back to `T::default()`.
    #[must_use]
    pub fn load_or_default(&self) -> T {
        self.load().unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    #[test]
    fn test_round_trip() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let repo: Repository<Vec<u32>> = Repository::new(store, "numbers");
        repo.save(&vec![1, 2, 3]).unwrap();
        assert_eq!(repo.load(), Some(vec![1, 2, 3]));
        repo.clear().unwrap();
        assert_eq!(repo.load(), None);
    }

    #[test]
    fn test_malformed_value_is_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set("numbers", "{not json").unwrap();
        let repo: Repository<Vec<u32>> = Repository::new(store, "numbers");
        assert_eq!(repo.load(), None);
        assert!(repo.load_or_default().is_empty());
    }

    #[test]
    fn test_unreadable_store_is_absent() {
        let repo: Repository<Vec<u32>> = Repository::new(Arc::new(BrokenStore), "numbers");
        assert_eq!(repo.load(), None);
        assert!(repo.save(&vec![1]).is_err());
    }
}
