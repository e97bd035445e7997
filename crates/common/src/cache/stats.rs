//! Hit/miss counters for the TTL map

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time statistics for a cache
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Entries currently stored, including expired ones not yet swept
    pub size: usize,
    pub max_size: Option<usize>,
    /// Reads that found a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Stored values, including those written by `update`
    pub inserts: u64,
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
}

impl CacheStats {
    /// Fraction of reads that hit; 0 before the first read
    pub fn hit_rate(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            reads => self.hits as f64 / reads as f64,
        }
    }
}

/// Something the map counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheEvent {
    Hit,
    Miss,
    Insert,
    Eviction,
    Expiration,
}

/// Counters shared by every clone of one cache
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters(Arc<[AtomicU64; 5]>);

impl Counters {
    pub(crate) fn bump(&self, event: CacheEvent) {
        self.0[event as usize].fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self, event: CacheEvent) -> u64 {
        self.0[event as usize].load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self, size: usize, max_size: Option<usize>) -> CacheStats {
        CacheStats {
            size,
            max_size,
            hits: self.load(CacheEvent::Hit),
            misses: self.load(CacheEvent::Miss),
            inserts: self.load(CacheEvent::Insert),
            evictions: self.load(CacheEvent::Eviction),
            expirations: self.load(CacheEvent::Expiration),
        }
    }

    pub(crate) fn reset(&self) {
        self.0.iter().for_each(|counter| counter.store(0, Ordering::Relaxed));
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::stats.
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats { hits: 80, misses: 20, ..Default::default() };
        assert!((stats.hit_rate() - 0.8).abs() < 1e-10);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    /// Validates that clones share counters.
    ///
    /// Assertions:
    /// - Events bumped through a clone show up in the original snapshot.
    /// - `reset` zeroes every counter.
    #[test]
    fn test_clones_share_counters() {
        let counters = Counters::default();
        let clone = counters.clone();

        clone.bump(CacheEvent::Hit);
        clone.bump(CacheEvent::Miss);
        counters.bump(CacheEvent::Insert);
        counters.bump(CacheEvent::Expiration);

        let snapshot = counters.snapshot(3, Some(10));
        assert_eq!((snapshot.hits, snapshot.misses, snapshot.inserts), (1, 1, 1));
        assert_eq!(snapshot.expirations, 1);
        assert_eq!(snapshot.evictions, 0);
        assert_eq!(snapshot.size, 3);

        counters.reset();
        assert_eq!(clone.snapshot(0, None), CacheStats::default());
    }
}
