use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use super::CacheService;
use crate::models::CacheResult;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at <= now)
    }
}

/// Process-local cache. Entries expire lazily on read.
#[derive(Debug, Default)]
pub struct MemoryCacheService {
    entries: DashMap<String, Entry>,
}

impl MemoryCacheService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheService for MemoryCacheService {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let value = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => None,
            None => return Ok(None),
        };

        if value.is_none() {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
            debug!(key = key, "Cache entry expired");
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCacheService::new();
        cache.set("dish_1_1", "[]", None).await.unwrap();

        assert_eq!(cache.get("dish_1_1").await.unwrap(), Some("[]".to_string()));
        cache.delete("dish_1_1").await.unwrap();
        assert_eq!(cache.get("dish_1_1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let cache = MemoryCacheService::new();
        cache
            .set("dish_1_1", "[]", Some(Duration::from_millis(10)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("dish_1_1").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_delete_prefix_only_touches_matching_keys() {
        let cache = MemoryCacheService::new();
        for key in ["dish_1_1", "dish_2_0", "setmeal_1_1"] {
            cache.set(key, "[]", None).await.unwrap();
        }

        assert_eq!(cache.delete_prefix("dish_").await.unwrap(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("setmeal_1_1").await.unwrap().is_some());
    }
}
