use crate::core::errors::MessmateError;
use crate::infrastructure::cache::Cache;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

struct CacheEntry {
    value: serde_json::Value,
    tags: Vec<String>,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        InMemoryCache {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, MessmateError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > Utc::now())
            .map(|e| e.value.clone()))
    }

    async fn put(
        &self,
        key: &str,
        value: serde_json::Value,
        tags: &[String],
        ttl: Duration,
    ) -> Result<(), MessmateError> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| MessmateError::CacheError(format!("invalid TTL: {}", e)))?;
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                tags: tags.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn invalidate_tags(&self, tags: &[String]) -> Result<(), MessmateError> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        entries.retain(|_, e| e.expires_at > now && !e.tags.iter().any(|t| tags.contains(t)));
        Ok(())
    }
}
