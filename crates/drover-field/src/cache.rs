//! Field reuse cache with tolerance-quantized keys.
//!
//! Two requests for "nearly" the same area must collapse onto one field:
//! overlapping agent groups converging on a shared destination would
//! otherwise each trigger full regeneration. [`CacheKey::quantize`]
//! discretizes every coordinate to a fixed tolerance before the key is
//! hashed, so requests within the tolerance of each other are identical
//! as far as the cache is concerned.

use crate::store::FieldHandle;
use drover_core::Vec2;
use indexmap::IndexMap;

/// A quantized (center, destination, radius) key.
///
/// Components are stored as integer multiples of the quantization
/// tolerance; equality and hashing therefore come straight from the
/// derived impls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    center: (i32, i32),
    destination: (i32, i32),
    radius: i32,
}

impl CacheKey {
    /// Discretize a request's geometry to `tolerance` world units.
    ///
    /// A non-positive tolerance falls back to 0.5, the documented default;
    /// a zero tolerance would make every float bit pattern its own key and
    /// defeat reuse entirely.
    pub fn quantize(center: Vec2, destination: Vec2, radius: f32, tolerance: f32) -> Self {
        let tol = if tolerance > 0.0 { tolerance } else { 0.5 };
        let q = |v: f32| (v / tol).round() as i32;
        Self {
            center: (q(center.x), q(center.y)),
            destination: (q(destination.x), q(destination.y)),
            radius: q(radius),
        }
    }
}

/// One cache slot: the field's handle and when it was last useful.
#[derive(Clone, Copy, Debug)]
struct CacheEntry {
    handle: FieldHandle,
    last_touched: f64,
}

/// Maps quantized request keys to live field handles.
///
/// The cache holds one logical reference to each entry's store slot; the
/// caller releases that reference for every handle returned by
/// [`sweep`](FieldCache::sweep). Entry iteration order is insertion order
/// (`IndexMap`), keeping eviction deterministic.
#[derive(Debug, Default)]
pub struct FieldCache {
    entries: IndexMap<CacheKey, CacheEntry>,
}

impl FieldCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, returning the cached handle if present.
    pub fn lookup(&self, key: &CacheKey) -> Option<FieldHandle> {
        self.entries.get(key).map(|e| e.handle)
    }

    /// Refresh a key's last-used time. No-op for unknown keys.
    pub fn touch(&mut self, key: &CacheKey, now: f64) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_touched = now;
        }
    }

    /// Insert a key → handle mapping, replacing any previous entry.
    ///
    /// Returns the handle of the replaced entry, whose cache reference the
    /// caller must release.
    pub fn insert(&mut self, key: CacheKey, handle: FieldHandle, now: f64) -> Option<FieldHandle> {
        self.entries
            .insert(
                key,
                CacheEntry {
                    handle,
                    last_touched: now,
                },
            )
            .map(|old| old.handle)
    }

    /// Evict entries untouched for longer than `retention` time units.
    ///
    /// Returns the evicted handles; the caller releases the cache
    /// reference on each, destroying fields no agent still uses.
    pub fn sweep(&mut self, now: f64, retention: f64) -> Vec<FieldHandle> {
        let mut evicted = Vec::new();
        self.entries.retain(|_, entry| {
            if now - entry.last_touched > retention {
                evicted.push(entry.handle);
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
