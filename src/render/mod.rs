//! Render-ready snapshot types.
//!
//! A snapshot is what the drawing loop consumes each frame: one entry per
//! visible tile, carrying either the decoded image or a placeholder state.
//! Building a snapshot never waits on pending fetches; a fetch that
//! completes later simply shows up in the next frame's snapshot.

use crate::core::grid::{ScreenRect, TileKey};
use crate::tiles::cache::{TileCache, TileImage};

/// What to paint for one visible tile.
#[derive(Debug, Clone)]
pub enum TilePaint {
    /// Decoded image is cached; draw it.
    Image(TileImage),
    /// A fetch is outstanding; draw a loading placeholder.
    Loading,
    /// Not cached and not yet requested; draw an empty placeholder.
    Pending,
}

impl TilePaint {
    /// Looks up the paint state for a key in the cache.
    pub fn for_key(cache: &TileCache, key: &TileKey) -> Self {
        if let Some(image) = cache.get(key) {
            TilePaint::Image(image)
        } else if cache.is_in_flight(key) {
            TilePaint::Loading
        } else {
            TilePaint::Pending
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, TilePaint::Image(_))
    }
}

/// One visible tile in a frame: where to draw it and what to draw.
#[derive(Debug, Clone)]
pub struct TileFrame {
    pub key: TileKey,
    pub rect: ScreenRect,
    pub paint: TilePaint,
}
