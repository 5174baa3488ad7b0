//! Chunk cache with lazy time-based expiry and insertion-order eviction.

use crate::model::{Chunk, ChunkKey};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_CAPACITY: usize = 50;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A stored chunk plus bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub chunk: Arc<Chunk>,
    pub stored_at: Instant,
    /// Serialized length of the chunk's entries (diagnostics only)
    pub size_estimate: usize,
}

impl CacheEntry {
    fn is_stale(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) > timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub size_estimate: usize,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or 0.0 before the first lookup.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Maps a request key to a previously fetched chunk.
///
/// Stale entries are treated as absent on lookup but stay in memory until
/// [`ChunkCache::cleanup_expired`] runs or capacity pressure evicts them.
/// Reads never refresh recency: eviction always drops the oldest insertion.
pub struct ChunkCache {
    entries: HashMap<ChunkKey, CacheEntry>,
    /// Keys in insertion order; front is evicted first
    insertion_order: VecDeque<ChunkKey>,
    capacity: usize,
    timeout: Duration,
    hits: u64,
    misses: u64,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, DEFAULT_TIMEOUT)
    }

    pub fn with_limits(capacity: usize, timeout: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity + 1),
            insertion_order: VecDeque::with_capacity(capacity + 1),
            capacity: capacity.max(1),
            timeout,
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up a chunk. A stale entry counts as a miss.
    pub fn get(&mut self, key: &ChunkKey, now: Instant) -> Option<Arc<Chunk>> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_stale(now, self.timeout) => {
                self.hits += 1;
                tracing::debug!(folder = %key.folder_id, page = key.query.page, "cache hit");
                Some(Arc::clone(&entry.chunk))
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts or overwrites a chunk.
    ///
    /// Overwriting keeps the key's original insertion position.
    pub fn put(&mut self, key: ChunkKey, chunk: Arc<Chunk>, now: Instant) {
        let size_estimate = estimate_size(&chunk);
        let entry = CacheEntry {
            chunk,
            stored_at: now,
            size_estimate,
        };

        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = entry;
            return;
        }

        self.insertion_order.push_back(key.clone());
        self.entries.insert(key, entry);

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.insertion_order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(folder = %oldest.folder_id, page = oldest.query.page, "cache evicted");
        }
    }

    /// Removes every stale entry. Returns how many were dropped.
    pub fn cleanup_expired(&mut self, now: Instant) -> usize {
        let timeout = self.timeout;
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_stale(now, timeout));
        let entries = &self.entries;
        self.insertion_order.retain(|key| entries.contains_key(key));
        before - self.entries.len()
    }

    /// Drops all entries. Hit/miss counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a key is physically present, stale or not.
    pub fn contains_key(&self, key: &ChunkKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            size_estimate: self.entries.values().map(|e| e.size_estimate).sum(),
        }
    }
}

impl Default for ChunkCache {
    fn default() -> Self {
        Self::new()
    }
}

fn estimate_size(chunk: &Chunk) -> usize {
    chunk
        .entries
        .iter()
        .map(|entry| serde_json::to_vec(entry.as_ref()).map(|v| v.len()).unwrap_or(0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entry, ListQuery};
    use chrono::{TimeZone, Utc};

    fn key(folder: &str, page: u32) -> ChunkKey {
        ChunkKey::new(folder, ListQuery::first_page(50).with_page(page))
    }

    fn chunk(name: &str) -> Arc<Chunk> {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        Arc::new(Chunk {
            entries: vec![Arc::new(Entry::file(name, name, ts, 1024))],
            total_count: 1,
            has_more: false,
            page: 1,
            last_page: 1,
        })
    }

    #[test]
    fn test_get_before_expiry_returns_stored_chunk() {
        let mut cache = ChunkCache::with_limits(50, Duration::from_secs(10));
        let now = Instant::now();
        let stored = chunk("plan.pdf");
        cache.put(key("root", 1), Arc::clone(&stored), now);

        let hit = cache.get(&key("root", 1), now + Duration::from_secs(9)).unwrap();

        assert!(Arc::ptr_eq(&hit, &stored));
        assert_eq!(hit.entries[0].name, "plan.pdf");
    }

    #[test]
    fn test_stale_entry_is_absent_but_not_removed() {
        let mut cache = ChunkCache::with_limits(50, Duration::from_secs(10));
        let now = Instant::now();
        cache.put(key("root", 1), chunk("a"), now);

        let later = now + Duration::from_secs(11);
        assert!(cache.get(&key("root", 1), later).is_none());
        assert!(cache.contains_key(&key("root", 1)));

        assert_eq!(cache.cleanup_expired(later), 1);
        assert!(!cache.contains_key(&key("root", 1)));
    }

    #[test]
    fn test_capacity_evicts_oldest_insertion() {
        let mut cache = ChunkCache::with_limits(3, DEFAULT_TIMEOUT);
        let now = Instant::now();
        for page in 1..=3 {
            cache.put(key("root", page), chunk("x"), now);
        }

        // Reading page 1 must not protect it from eviction.
        assert!(cache.get(&key("root", 1), now).is_some());
        cache.put(key("root", 4), chunk("x"), now);

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&key("root", 1), now).is_none());
        assert!(cache.get(&key("root", 2), now).is_some());
    }

    #[test]
    fn test_overwrite_keeps_insertion_position() {
        let mut cache = ChunkCache::with_limits(2, DEFAULT_TIMEOUT);
        let now = Instant::now();
        cache.put(key("root", 1), chunk("old"), now);
        cache.put(key("root", 2), chunk("x"), now);
        cache.put(key("root", 1), chunk("new"), now);
        cache.put(key("root", 3), chunk("x"), now);

        assert!(cache.get(&key("root", 1), now).is_none());
        assert!(cache.get(&key("root", 2), now).is_some());
    }

    #[test]
    fn test_hit_ratio_counts_stale_as_miss() {
        let mut cache = ChunkCache::with_limits(5, Duration::from_secs(1));
        let now = Instant::now();
        cache.put(key("root", 1), chunk("a"), now);

        cache.get(&key("root", 1), now);
        cache.get(&key("root", 1), now + Duration::from_secs(2));
        cache.get(&key("other", 1), now);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert!((stats.hit_ratio() - 1.0 / 3.0).abs() < 1e-9);
        assert!(stats.size_estimate > 0);
    }
}
