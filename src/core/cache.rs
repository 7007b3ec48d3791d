//! Key-value caching abstractions

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A named bag of byte keys and values with optional expiry.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    async fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>);
    async fn remove(&self, key: &[u8]);
}

pub trait Store: Send + Sync {
    /// Returns the collection called `name`. A `persist` collection outlives
    /// the process when the store has a data directory.
    fn get_collection(
        &self,
        name: &str,
        persist: bool,
        create_if_missing: bool,
    ) -> Option<Arc<dyn KeyValueCollection>>;

    fn remove_collection(&self, name: &str) -> bool;
}
