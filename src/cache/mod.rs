//! Catalog list cache.
//!
//! Lists served to the ordering front end are cached under structured keys
//! (`dish_{categoryId}_{status}`, `setmeal_{categoryId}_{status}`) and evicted
//! explicitly whenever a write could make them stale. Cache failures never fail
//! a request: reads fall back to the store and failed evictions are logged.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{CacheError, CacheResult, DishView, SaleStatus, Setmeal};
use crate::observability::Metrics;

pub use self::memory::MemoryCacheService;
pub use self::redis::RedisCacheService;

pub const DISH_PREFIX: &str = "dish_";
pub const SETMEAL_PREFIX: &str = "setmeal_";

/// Key-value cache backend
#[async_trait]
pub trait CacheService: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value; `None` keeps it until deleted
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Delete every key starting with `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64>;

    async fn health_check(&self) -> CacheResult<bool>;

    fn provider_name(&self) -> &'static str;
}

/// Structured cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    DishList {
        category_id: i64,
        status: SaleStatus,
    },
    SetmealList {
        category_id: i64,
        status: SaleStatus,
    },
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::DishList {
                category_id,
                status,
            } => write!(f, "{}{}_{}", DISH_PREFIX, category_id, status),
            CacheKey::SetmealList {
                category_id,
                status,
            } => write!(f, "{}{}_{}", SETMEAL_PREFIX, category_id, status),
        }
    }
}

impl CacheKey {
    fn family(&self) -> &'static str {
        match self {
            CacheKey::DishList { .. } => "dish",
            CacheKey::SetmealList { .. } => "setmeal",
        }
    }
}

/// Typed catalog cache with the invalidation policy of the catalog services
#[derive(Clone)]
pub struct CatalogCache {
    provider: Arc<dyn CacheService>,
    dish_ttl: Option<Duration>,
    setmeal_ttl: Option<Duration>,
    metrics: Option<Arc<Metrics>>,
}

impl CatalogCache {
    pub fn new(
        provider: Arc<dyn CacheService>,
        dish_ttl: Option<Duration>,
        setmeal_ttl: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            dish_ttl,
            setmeal_ttl,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub async fn health_check(&self) -> CacheResult<bool> {
        self.provider.health_check().await
    }

    pub async fn get_dishes(&self, category_id: i64, status: SaleStatus) -> Option<Vec<DishView>> {
        self.get_json(CacheKey::DishList {
            category_id,
            status,
        })
        .await
    }

    pub async fn put_dishes(&self, category_id: i64, status: SaleStatus, dishes: &[DishView]) {
        let key = CacheKey::DishList {
            category_id,
            status,
        };
        self.set_json(key, dishes, self.dish_ttl).await;
    }

    pub async fn get_setmeals(&self, category_id: i64, status: SaleStatus) -> Option<Vec<Setmeal>> {
        self.get_json(CacheKey::SetmealList {
            category_id,
            status,
        })
        .await
    }

    pub async fn put_setmeals(&self, category_id: i64, status: SaleStatus, setmeals: &[Setmeal]) {
        let key = CacheKey::SetmealList {
            category_id,
            status,
        };
        self.set_json(key, setmeals, self.setmeal_ttl).await;
    }

    /// Evict both status variants of one category's dish list
    pub async fn evict_dish_category(&self, category_id: i64) {
        for status in [SaleStatus::OnSale, SaleStatus::Stopped] {
            let key = CacheKey::DishList {
                category_id,
                status,
            }
            .to_string();
            if let Err(e) = self.provider.delete(&key).await {
                warn!(key = %key, error = %e, "Failed to evict cache entry");
            }
        }
    }

    pub async fn evict_all_dishes(&self) {
        self.evict_prefix(DISH_PREFIX).await;
    }

    pub async fn evict_all_setmeals(&self) {
        self.evict_prefix(SETMEAL_PREFIX).await;
    }

    async fn evict_prefix(&self, prefix: &str) {
        match self.provider.delete_prefix(prefix).await {
            Ok(deleted) => debug!(prefix = prefix, deleted = deleted, "Evicted cache family"),
            Err(e) => warn!(prefix = prefix, error = %e, "Failed to evict cache family"),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        let raw_key = key.to_string();
        let outcome = match self.provider.get(&raw_key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => Ok(value),
                Err(e) => Err(CacheError::Serialization(e.to_string())),
            },
            Ok(None) => {
                self.record(key, "miss");
                return None;
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => {
                self.record(key, "hit");
                Some(value)
            }
            Err(e) => {
                self.record(key, "error");
                warn!(key = %raw_key, error = %e, "Cache read failed, falling back to store");
                None
            }
        }
    }

    async fn set_json<T: Serialize + ?Sized>(&self, key: CacheKey, value: &T, ttl: Option<Duration>) {
        let raw_key = key.to_string();
        let result = match serde_json::to_string(value) {
            Ok(raw) => self.provider.set(&raw_key, &raw, ttl).await,
            Err(e) => Err(CacheError::Serialization(e.to_string())),
        };
        if let Err(e) = result {
            warn!(key = %raw_key, error = %e, "Failed to populate cache");
        }
    }

    fn record(&self, key: CacheKey, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_lookup(key.family(), outcome);
        }
    }
}
