use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Get/put cache consulted by the gateway; values are opaque strings
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// `ttl = None` keeps the entry for the cache's lifetime
    fn put(&self, key: &str, value: String, ttl: Option<Duration>);

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Key for a raw transaction
pub fn rawtx_key(txid: &bitcoin::Txid) -> String {
    format!("rawtx:{}", txid)
}

/// Key for an address's UTXO list
pub fn utxos_key(address: &str) -> String {
    format!("utxos:{}", address)
}

/// Key for a single output's details
pub fn utxo_key(txid: &bitcoin::Txid, vout: u32, include_ancestors: bool) -> String {
    format!("utxo:{}:{}:{}", txid, vout, include_ancestors)
}

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// Thread-safe in-memory cache with per-entry TTL
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_miss(&self, key: &str) -> Option<String> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss: {}", key);
        None
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache hit: {}", key);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return self.record_miss(key),
            }
        }

        // Expired: drop it so the map does not grow without bound
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        self.record_miss(key)
    }

    fn put(&self, key: &str, value: String, ttl: Option<Duration>) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Sweep keys that expired without being read again
        let before = entries.len();
        entries.retain(|_, cached| cached.is_live(now));
        if entries.len() < before {
            debug!("Swept {} expired cache entries", before - entries.len());
        }
        entries.insert(key.to_string(), entry);
        drop(entries);
        debug!("Cached {} (ttl {:?})", key, ttl);
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache performance statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            (self.hits as f64 / (self.hits + self.misses) as f64) * 100.0
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }
}
