//! # lunaview
//!
//! A pan/zoom viewer core for quad-tile raster pyramids backed by a remote
//! tile-serving API.
//!
//! The crate maps a continuous 2-D viewport (pan offset + integer zoom
//! level) to the set of visible tile coordinates, fetches each visible tile
//! exactly once, caches the decoded images, and exposes a render-ready
//! snapshot to a drawing loop that never blocks on network I/O.

pub mod api;
pub mod core;
pub mod input;
pub mod render;
pub mod tiles;
pub mod viewer;

// Re-export public API
pub use crate::core::{
    config::{FetchConfig, ViewerConfig},
    grid::{Point, ScreenRect, TileKey, TILE_SIZE},
    viewport::ViewportController,
};

pub use crate::api::{HttpTileApi, Product, TileFetcher};

pub use crate::input::events::{InputEvent, PointerInputSource};

pub use crate::render::{TileFrame, TilePaint};

pub use crate::tiles::{cache::TileCache, fetch::FetchCoordinator};

pub use crate::viewer::Viewer;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Unknown product: {0}")]
    UnknownProduct(String),
}

/// Error type alias for convenience
pub type Error = ViewerError;
