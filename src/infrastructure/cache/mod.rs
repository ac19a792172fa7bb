pub mod cache_keys;
pub mod in_memory;

use crate::core::errors::MessmateError;
use async_trait::async_trait;
use std::time::Duration;

/// Memoization seam for expensive reads. Entries carry tags; one mutation
/// invalidates every cached read sharing an affected tag. TTL is the safety
/// net, tag invalidation is the mechanism.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, MessmateError>;
    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        tags: &[String],
        ttl: Duration,
    ) -> Result<(), MessmateError>;
    async fn invalidate_tags(&self, tags: &[String]) -> Result<(), MessmateError>;
}
