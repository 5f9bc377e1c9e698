//! Bounded memoization cache
//!
//! A FIFO-evicting map used by the coercer to remember the typed value of
//! recently seen field texts. Real CSV columns repeat a lot (status codes,
//! booleans, small integers), so a hit skips the regex cascade entirely.
//!
//! # Implementation Details
//!
//! 1. **Map**: `hashbrown` keyed by the owned field text, hashed with `ahash`
//! 2. **Order**: a `VecDeque` of keys in insertion order; the front is evicted
//!    once `capacity` entries are held
//!
//! A capacity of 0 disables the cache: every lookup misses and nothing is
//! stored. Each cache is owned by one decoder; there is no global state.

use std::borrow::Borrow;
use std::collections::VecDeque;
use std::hash::Hash;

use ahash::RandomState;
use hashbrown::HashMap;

/// FIFO cache with hit/miss statistics
#[derive(Debug, Clone)]
pub struct BoundedCache<K, V> {
    map: HashMap<K, V, RandomState>,
    order: VecDeque<K>,
    capacity: usize,

    /// Statistics
    hits: u64,
    misses: u64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let initial = capacity.min(1024);
        Self {
            map: HashMap::with_capacity_and_hasher(initial, RandomState::new()),
            order: VecDeque::with_capacity(initial),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up an entry, counting the hit or miss
    #[inline]
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.map.get(key) {
            Some(v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert an entry, evicting the oldest one when full
    pub fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        if let Some(slot) = self.map.get_mut(&key) {
            *slot = value;
            return;
        }
        if self.map.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.map.insert(key, value);
    }

    /// Clear entries and statistics
    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Get cache statistics: `(hits, misses, hit_rate)`
    #[inline]
    pub fn stats(&self) -> (u64, u64, f64) {
        let total = self.hits + self.misses;
        let hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };
        (self.hits, self.misses, hit_rate)
    }

    /// Get the number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
