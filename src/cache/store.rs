use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("cache transport error: {0}")]
    Transport(String),

    #[error("cache responded with an error: {0}")]
    Response(String),

    #[error("cache backend does not support {0}")]
    Unsupported(String),
}

/// One page of a cursor-based keyspace scan. A `cursor` of `0` means the
/// iteration is complete.
#[derive(Debug, Default)]
pub struct ScanPage {
    pub cursor: u64,
    pub keys: Vec<String>,
}

/// Raw string commands against a remote key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), KvError>;

    /// Returns the number of keys actually removed.
    async fn del(&self, keys: &[String]) -> Result<u64, KvError>;

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage, KvError>;

    fn name(&self) -> &'static str;
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
    seq: u64,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-process store with per-entry expiry. Patterns support a single
/// trailing `*`; anything else is matched literally.
///
/// Scan cursors are write sequence numbers, so deleting keys between pages
/// never makes the scan skip entries.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    next_seq: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn purge_expired(entries: &mut HashMap<String, MemoryEntry>, now: Instant) {
        entries.retain(|_, entry| entry.is_live(now));
    }

    fn matches(pattern: &str, key: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == pattern,
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it so the map does not keep dead entries around.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), KvError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, now);
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: now + Duration::from_secs(ttl_seconds),
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64, KvError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if entry.is_live(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage, KvError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Self::purge_expired(&mut entries, now);

        let mut matching: Vec<(u64, &String)> = entries
            .iter()
            .filter(|(key, entry)| {
                entry.seq >= cursor && entry.is_live(now) && Self::matches(pattern, key)
            })
            .map(|(key, entry)| (entry.seq, key))
            .collect();
        matching.sort();

        let take = count.max(1);
        let next = match matching.get(take) {
            Some((seq, _)) => *seq,
            None => 0,
        };
        let keys = matching
            .into_iter()
            .take(take)
            .map(|(_, key)| key.to_string())
            .collect();

        Ok(ScanPage { cursor: next, keys })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
