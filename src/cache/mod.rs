pub mod keys;
pub mod store;
pub mod upstash;

use crate::config::CacheConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use keys::{chat_key, query_key, CHAT_PREFIX, QUERY_PREFIX};
pub use store::{KvError, KvStore, MemoryStore};

/// Lifetime of every cache entry written by this service.
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

const SCAN_BATCH: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    pub ttl_seconds: u64,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PrefixDeletion {
    pub deleted: u64,
    /// Set when the backend cannot scan and entries must be cleared by hand.
    pub hint: Option<String>,
}

/// Best-effort read-through cache over a [`KvStore`].
///
/// No operation here fails the caller: transport errors are logged and read
/// as misses, writes and deletes are dropped.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn KvStore>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self, KvError> {
        let backend: Arc<dyn KvStore> = match config.backend.as_str() {
            "upstash" => Arc::new(upstash::UpstashStore::new(config)?),
            "memory" => Arc::new(MemoryStore::new()),
            other => {
                return Err(KvError::Unsupported(format!("cache backend '{}'", other)));
            }
        };
        Ok(Self::new(backend))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Fetches a value, decoding it as JSON when possible and falling back to
    /// the raw string otherwise.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        match self.backend.get(key).await {
            Ok(Some(raw)) => {
                debug!("Cache hit for {}", key);
                Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
            }
            Ok(None) => {
                debug!("Cache miss for {}", key);
                None
            }
            Err(e) => {
                warn!("Cache get failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Typed read. A stored value that does not fit `T` is treated as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!("Cached value under {} has an unexpected shape: {}", key, e);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, options: SetOptions) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not serialize cache value for {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.backend.set_ex(key, &payload, options.ttl_seconds).await {
            warn!("Cache set failed for {}: {}", key, e);
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.backend.del(&[key.to_string()]).await {
            warn!("Cache delete failed for {}: {}", key, e);
        }
    }

    /// Deletes every key starting with `prefix`, walking the keyspace with a
    /// cursor scan rather than a blocking listing.
    pub async fn delete_by_prefix(&self, prefix: &str) -> PrefixDeletion {
        let pattern = format!("{}*", prefix);
        let mut cursor = 0u64;
        let mut result = PrefixDeletion::default();

        loop {
            let page = match self.backend.scan(cursor, &pattern, SCAN_BATCH).await {
                Ok(page) => page,
                Err(KvError::Unsupported(what)) => {
                    warn!("Cache backend cannot scan for {}: {}", pattern, what);
                    return PrefixDeletion {
                        deleted: 0,
                        hint: Some(format!(
                            "The cache backend does not support SCAN; clear '{}' keys manually",
                            pattern
                        )),
                    };
                }
                Err(e) => {
                    warn!("Cache scan failed for {}: {}", pattern, e);
                    break;
                }
            };

            if !page.keys.is_empty() {
                match self.backend.del(&page.keys).await {
                    Ok(count) => result.deleted += count,
                    Err(e) => warn!("Cache batch delete failed for {}: {}", pattern, e),
                }
            }

            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }

        info!("Deleted {} cache entries matching {}", result.deleted, pattern);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingStore, NoScanStore};
    use serde_json::json;

    fn memory_cache() -> (CacheStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CacheStore::new(store.clone()), store)
    }

    #[tokio::test]
    async fn round_trips_json_values() {
        let (cache, _) = memory_cache();
        let value = json!({"sql": "SELECT 1", "data": [{"total": 99441}], "cached": false});
        cache.set("query:x", &value, SetOptions::default()).await;
        assert_eq!(cache.get_value("query:x").await, Some(value.clone()));
        assert_eq!(cache.get_value("query:x").await, Some(value));
    }

    #[tokio::test]
    async fn non_json_values_come_back_as_raw_strings() {
        let (cache, store) = memory_cache();
        store.set_ex("chat:abc", "plain text, not json", 60).await.unwrap();
        assert_eq!(
            cache.get_value("chat:abc").await,
            Some(Value::String("plain text, not json".to_string()))
        );
        assert_eq!(
            cache.get::<String>("chat:abc").await.as_deref(),
            Some("plain text, not json")
        );
    }

    #[tokio::test]
    async fn shape_mismatch_reads_as_miss() {
        let (cache, _) = memory_cache();
        cache.set("query:x", &json!([1, 2, 3]), SetOptions::default()).await;
        assert_eq!(cache.get::<String>("query:x").await, None);
    }

    #[tokio::test]
    async fn transport_failures_are_swallowed() {
        let cache = CacheStore::new(Arc::new(FailingStore));
        assert_eq!(cache.get_value("query:x").await, None);
        cache.set("query:x", &json!(1), SetOptions::default()).await;
        cache.delete("query:x").await;
        assert_eq!(cache.delete_by_prefix("query:").await.deleted, 0);
    }

    #[tokio::test]
    async fn delete_removes_single_key() {
        let (cache, _) = memory_cache();
        cache.set("query:x", &json!(1), SetOptions::default()).await;
        cache.delete("query:x").await;
        assert_eq!(cache.get_value("query:x").await, None);
    }

    #[tokio::test]
    async fn delete_by_prefix_only_touches_matching_keys() {
        let (cache, _) = memory_cache();
        for i in 0..250 {
            cache.set(&format!("query:{}", i), &json!(i), SetOptions::default()).await;
        }
        cache.set("chat:keep", &json!("hi"), SetOptions::default()).await;

        let deletion = cache.delete_by_prefix("query:").await;
        assert_eq!(deletion.deleted, 250);
        assert_eq!(deletion.hint, None);
        assert_eq!(cache.get_value("query:7").await, None);
        assert_eq!(cache.get_value("chat:keep").await, Some(json!("hi")));
    }

    #[tokio::test]
    async fn delete_by_prefix_reports_missing_scan_support() {
        let cache = CacheStore::new(Arc::new(NoScanStore));
        let deletion = cache.delete_by_prefix("chat:").await;
        assert_eq!(deletion.deleted, 0);
        assert!(deletion.hint.unwrap().contains("manually"));
    }

    #[test]
    fn rejects_unknown_backend() {
        let config = CacheConfig {
            backend: "memcached".to_string(),
            url: None,
            token: None,
        };
        assert!(CacheStore::from_config(&config).is_err());
    }
}
