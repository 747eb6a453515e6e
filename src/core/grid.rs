//! Pure tile-grid math: mapping a viewport (zoom, pan, pixel size) to the
//! visible tile coordinates and between tile-grid and screen pixels.
//!
//! At zoom level `z` the pyramid has a `2^z x 2^z` grid of square tiles,
//! each drawn at [`TILE_SIZE`] screen pixels; the grid extent is therefore
//! `TILE_SIZE * 2^z` pixels per axis. Everything here is stateless.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tile edge length in screen pixels.
pub const TILE_SIZE: u32 = 256;

/// Deepest zoom level the grid math supports: `u32` tile indices hold at
/// most `2^31` tiles per axis. Backend metadata advertising a deeper
/// pyramid is clamped here rather than trusted.
pub const MAX_ZOOM: u8 = 31;

/// A tile coordinate in the quad pyramid.
///
/// Valid keys satisfy `row < 2^zoom` and `col < 2^zoom`; the grid math
/// clamps ranges before producing keys, so invalid keys cannot reach the
/// cache or the fetch path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub zoom: u8,
    pub row: u32,
    pub col: u32,
}

impl TileKey {
    pub fn new(zoom: u8, row: u32, col: u32) -> Self {
        Self { zoom, row, col }
    }

    /// Checks the `row, col < 2^zoom` invariant.
    pub fn is_valid(&self) -> bool {
        let n = grid_size(self.zoom);
        self.row < n && self.col < n
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.zoom, self.row, self.col)
    }
}

/// A point in screen or pan-offset coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Screen-space rectangle of a rendered tile (tiles are square).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// Number of tiles per axis at `zoom`, saturating at [`MAX_ZOOM`].
pub fn grid_size(zoom: u8) -> u32 {
    1u32 << zoom.min(MAX_ZOOM)
}

/// Pixel extent of the whole grid at `zoom`.
pub fn grid_extent(zoom: u8) -> f64 {
    TILE_SIZE as f64 * grid_size(zoom) as f64
}

/// Computes the set of tile keys intersecting a viewport.
///
/// `pan` is the pixel offset of the grid origin (row 0, col 0) from the
/// viewport's top-left corner. The returned keys are clamped to the grid:
/// an empty viewport or a fully off-grid pan yields an empty vec, and no
/// key ever carries a negative or out-of-range index.
pub fn visible_tiles(zoom: u8, pan: Point, viewport_w: f64, viewport_h: f64) -> Vec<TileKey> {
    if viewport_w <= 0.0 || viewport_h <= 0.0 {
        return Vec::new();
    }

    let t = TILE_SIZE as f64;
    let max_index = grid_size(zoom) as i64 - 1;

    // A tile covers the half-open span [col*T + pan.x, (col+1)*T + pan.x);
    // it intersects the viewport iff col*T + pan.x < w and the span end is
    // positive. The end bound is therefore ceil((w - pan.x) / T) - 1.
    let col_start = ((-pan.x / t).floor() as i64).max(0);
    let col_end = (((viewport_w - pan.x) / t).ceil() as i64 - 1).min(max_index);
    let row_start = ((-pan.y / t).floor() as i64).max(0);
    let row_end = (((viewport_h - pan.y) / t).ceil() as i64 - 1).min(max_index);

    if col_start > col_end || row_start > row_end {
        return Vec::new();
    }

    let mut keys =
        Vec::with_capacity(((row_end - row_start + 1) * (col_end - col_start + 1)) as usize);
    for row in row_start..=row_end {
        for col in col_start..=col_end {
            keys.push(TileKey::new(zoom, row as u32, col as u32));
        }
    }
    keys
}

/// Screen rectangle of a tile at the given pan offset.
pub fn tile_screen_rect(key: TileKey, pan: Point) -> ScreenRect {
    let t = TILE_SIZE as f64;
    ScreenRect {
        x: key.col as f64 * t + pan.x,
        y: key.row as f64 * t + pan.y,
        size: t,
    }
}

/// New pan offset for a zoom change anchored at a fixed screen point.
///
/// The grid point under `center` before the change stays under `center`
/// after it: `new_pan = center - (center - pan) * 2^(new - old)` per axis.
pub fn zoom_anchored_at_center(old_zoom: u8, new_zoom: u8, pan: Point, center: Point) -> Point {
    let scale = 2f64.powi(new_zoom as i32 - old_zoom as i32);
    Point::new(
        center.x - (center.x - pan.x) * scale,
        center.y - (center.y - pan.y) * scale,
    )
}
