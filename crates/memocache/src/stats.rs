//! Cache statistics tracking

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Hit/miss counters for one memoized function
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    inserts: AtomicU64,
}

impl CacheStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an eviction
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an insert
    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get total misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get total evictions
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Get total inserts
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Hits plus misses
    pub fn total(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Calculate hit ratio (0.0 to 1.0); 0.0 before the first call
    pub fn hit_ratio(&self) -> f64 {
        ratio(self.hits(), self.misses())
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
    }

    /// Freeze the counters together with the store's occupancy
    pub fn snapshot(&self, size: usize, capacity: usize) -> StatsSnapshot {
        let hits = self.hits();
        let misses = self.misses();
        StatsSnapshot {
            hits,
            misses,
            total: hits + misses,
            hit_rate: ratio(hits, misses),
            evictions: self.evictions(),
            inserts: self.inserts(),
            size,
            capacity,
        }
    }
}

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Point-in-time view of a cache's statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Calls answered from the store
    pub hits: u64,
    /// Calls that ran the computation
    pub misses: u64,
    /// `hits + misses`
    pub total: u64,
    /// `hits / total`, or 0.0 when no calls were made
    pub hit_rate: f64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Results written to the store
    pub inserts: u64,
    /// Entries currently stored
    pub size: usize,
    /// Maximum entries
    pub capacity: usize,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size {}/{}, hits {}, misses {}, total {}, hit rate {:.1}%",
            self.size,
            self.capacity,
            self.hits,
            self.misses,
            self.total,
            self.hit_rate * 100.0
        )
    }
}
