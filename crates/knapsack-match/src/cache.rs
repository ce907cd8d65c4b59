//! Optional result cache.
//!
//! Keyed by a SHA-256 over the need, the resource pool and `top_k`.
//! Only successful matches are stored.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use knapsack_core::{Need, Resource};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::types::MatchResult;

/// Storage hook for match results.
pub trait MatchCache: Send + Sync {
    fn get(&self, key: &str) -> Option<MatchResult>;
    fn put(&self, key: String, result: MatchResult);
}

/// Cache key for one match request.
pub fn cache_key(need: &Need, resources: &[Resource], top_k: usize) -> String {
    let mut hasher = Sha256::new();
    let payload = serde_json::json!({
        "need": need,
        "resources": resources,
        "top_k": top_k,
    });
    hasher.update(payload.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

struct CacheEntry {
    result: MatchResult,
    inserted_at: Instant,
}

/// Thread-safe in-memory LRU with a TTL.
pub struct MemoryMatchCache {
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Least recently used at the front.
    order: VecDeque<String>,
    max_size: usize,
    ttl: Duration,
}

impl CacheInner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

impl MemoryMatchCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(max_size),
                order: VecDeque::with_capacity(max_size),
                max_size,
                ttl,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MatchCache for MemoryMatchCache {
    fn get(&self, key: &str) -> Option<MatchResult> {
        let mut inner = self.inner.lock();
        let ttl = inner.ttl;

        let (result, expired) = match inner.entries.get(key) {
            Some(entry) => (entry.result.clone(), entry.inserted_at.elapsed() >= ttl),
            None => return None,
        };

        if expired {
            inner.remove(key);
            return None;
        }

        inner.touch(key);
        Some(result)
    }

    fn put(&self, key: String, result: MatchResult) {
        let mut inner = self.inner.lock();
        if inner.max_size == 0 {
            return;
        }

        if inner.entries.contains_key(&key) {
            inner.touch(&key);
        } else {
            while inner.entries.len() >= inner.max_size {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
            inner.order.push_back(key.clone());
        }

        inner.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }
}
