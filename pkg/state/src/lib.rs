//! Key/value storage surface for the kubevend engine.
//!
//! The embedding host owns durable storage; the engine only sees this
//! get/put/delete/list interface. `StateStore` is the SlateDB-backed
//! implementation used by the dev harness, `MemoryStorage` backs tests.

use anyhow::Result;
use async_trait::async_trait;

pub mod client;
pub mod memory;

pub use client::StateStore;
pub use memory::MemoryStorage;

/// Host-provided durable key/value storage.
///
/// Assumed linearizable per key; the engine tolerates benign double-writes
/// (WAL deletes are idempotent) and never does read-modify-write races
/// across keys.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Retrieve the value for a key, or `None` if it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value under the given key.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List all keys starting with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
