//! Viewer configuration.

use std::time::Duration;

/// Top-level configuration for a [`crate::Viewer`].
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Zoom level applied when a product becomes current.
    pub initial_zoom: u8,
    /// Fetch behaviour.
    pub fetch: FetchConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            initial_zoom: 1,
            fetch: FetchConfig::default(),
        }
    }
}

/// Configuration for the tile fetch coordinator.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum concurrent tile downloads.
    pub max_concurrent: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl FetchConfig {
    pub fn for_testing() -> Self {
        Self {
            max_concurrent: 4,
            request_timeout: Duration::from_millis(500),
        }
    }
}
