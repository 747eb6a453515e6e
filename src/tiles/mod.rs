pub mod cache;
pub mod fetch;

// Re-exports for convenience
pub use cache::{TileCache, TileImage};
pub use fetch::{FetchCoordinator, FetchError, FetchOutcome};
