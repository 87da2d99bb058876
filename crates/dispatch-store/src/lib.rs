//! Synchronous key-value persistence underneath the assignment cache.
//!
//! Values are opaque strings scoped by string keys. Reads and writes complete
//! before returning; there is no async surface here.

pub mod error;
pub mod file;
pub mod memory;

use dispatch_core::constants::STORAGE_KEY_SEPARATOR;
use dispatch_core::types::{DateKey, partition_label};

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Synchronous string store, the durability layer beneath in-memory caches.
pub trait KeyValueStore: Send + Sync {
    /// ## Summary
    /// Reads the value stored under `key`.
    ///
    /// ## Errors
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// ## Summary
    /// Replaces the value stored under `key`.
    ///
    /// ## Errors
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// ## Summary
    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// ## Errors
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// ## Summary
/// Storage key of a cache partition: `"<namespace>:<dateKeyOrDefault>"`.
#[must_use]
pub fn storage_key(namespace: &str, date: Option<&DateKey>) -> String {
    format!(
        "{namespace}{STORAGE_KEY_SEPARATOR}{}",
        partition_label(date)
    )
}
