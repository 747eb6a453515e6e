//! In-memory store of decoded tile images plus the set of tile keys with a
//! fetch currently outstanding.
//!
//! The cache is scoped to one active product and mutated only from the
//! owner thread. Its lifecycle is all-or-nothing: a zoom change or product
//! switch clears every entry and the whole in-flight set; pan-only changes
//! never invalidate. Each invalidation bumps a generation counter, and an
//! insert only takes effect when the inserting fetch still belongs to the
//! current generation — results of fetches issued before an invalidation
//! are discarded on arrival.

use std::sync::Arc;

use fxhash::{FxHashMap, FxHashSet};
use image::RgbaImage;

use crate::core::grid::TileKey;

/// Decoded tile image handle shared with render snapshots.
pub type TileImage = Arc<RgbaImage>;

#[derive(Debug, Default)]
pub struct TileCache {
    entries: FxHashMap<TileKey, TileImage>,
    in_flight: FxHashSet<TileKey>,
    generation: u64,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation the cache is currently accepting inserts for. Captured by
    /// fetch tasks at issue time.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, key: &TileKey) -> Option<TileImage> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_in_flight(&self, key: &TileKey) -> bool {
        self.in_flight.contains(key)
    }

    /// Idempotent; a no-op for keys that are already cached.
    pub fn mark_in_flight(&mut self, key: TileKey) {
        if !self.entries.contains_key(&key) {
            self.in_flight.insert(key);
        }
    }

    pub fn clear_in_flight(&mut self, key: &TileKey) {
        self.in_flight.remove(key);
    }

    /// Installs a decoded tile, provided `generation` still matches the
    /// cache's current generation. A mismatched insert is a no-op and the
    /// image is dropped immediately (stale-fetch guard). Returns whether
    /// the entry was installed.
    pub fn insert(&mut self, key: TileKey, image: TileImage, generation: u64) -> bool {
        if generation != self.generation {
            log::debug!("discarding stale tile {} (gen {} != {})", key, generation, self.generation);
            return false;
        }
        // A key is never simultaneously cached and in flight.
        self.in_flight.remove(&key);
        self.entries.insert(key, image);
        true
    }

    /// Releases every cached entry and forgets all in-flight keys, then
    /// bumps the generation so late completions are discarded on arrival.
    /// Called on zoom change and product change only.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.in_flight.clear();
        self.generation += 1;
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys with an outstanding fetch.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}
