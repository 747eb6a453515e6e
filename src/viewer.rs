//! The viewer aggregate: one owned value holding the current product, the
//! viewport controller, the tile cache and the fetch coordinator.
//!
//! All mutation happens through this type on the owner thread; fetch
//! completions reach it only through the coordinator's channel when
//! [`Viewer::render_snapshot`] pumps them. There is no ambient global
//! state; every viewer instance is fully self-contained.

use std::sync::Arc;

use crate::api::{Product, TileFetcher};
use crate::core::config::ViewerConfig;
use crate::core::grid::{self, Point, TileKey};
use crate::core::viewport::ViewportController;
use crate::input::events::InputEvent;
use crate::render::{TileFrame, TilePaint};
use crate::tiles::cache::TileCache;
use crate::tiles::fetch::FetchCoordinator;

pub struct Viewer {
    config: ViewerConfig,
    product: Option<Product>,
    viewport: ViewportController,
    cache: TileCache,
    coordinator: FetchCoordinator,
}

impl Viewer {
    pub fn new(fetcher: Arc<dyn TileFetcher>, viewport_size: Point, config: ViewerConfig) -> Self {
        let coordinator = FetchCoordinator::new(fetcher, &config.fetch);
        Self {
            config,
            product: None,
            viewport: ViewportController::new(viewport_size, 0),
            cache: TileCache::new(),
            coordinator,
        }
    }

    pub fn product(&self) -> Option<&Product> {
        self.product.as_ref()
    }

    /// Makes `product` current: clears the cache, resets the viewport to
    /// the baseline view and starts fetching the newly visible tiles.
    pub fn set_product(&mut self, product: Product) {
        log::info!("switching product to {}", product.id);
        self.cache.invalidate_all();
        self.viewport.reset(product.max_zoom, self.config.initial_zoom);
        self.product = Some(product);
        self.reconcile();
    }

    /// Applies one normalized input event. A drag or zoom issued while no
    /// product is selected is a no-op; resizes track the viewport geometry
    /// regardless, so the first `set_product` centers against the real
    /// canvas size.
    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Resize { size } => {
                self.viewport.set_size(size);
                self.reconcile();
            }
            _ if self.product.is_none() => {}
            InputEvent::DragStart { position } => self.viewport.start_drag(position),
            InputEvent::Drag { position } => {
                // Pan-only change: cache entries survive, only the visible
                // set is re-evaluated.
                if self.viewport.drag_to(position) {
                    self.reconcile();
                }
            }
            InputEvent::DragEnd => self.viewport.end_drag(),
            InputEvent::Scroll { delta, .. } => {
                let steps = if delta > 0.0 {
                    1
                } else if delta < 0.0 {
                    -1
                } else {
                    0
                };
                if steps != 0 && self.viewport.zoom_by(steps) {
                    self.invalidate_and_refetch();
                }
            }
        }
    }

    /// Host-level zoom request; clamped to the product's range.
    pub fn set_zoom(&mut self, target: u8) {
        if self.product.is_none() {
            return;
        }
        if self.viewport.set_zoom(target) {
            self.invalidate_and_refetch();
        }
    }

    pub fn zoom(&self) -> u8 {
        self.viewport.zoom()
    }

    pub fn pan(&self) -> Point {
        self.viewport.pan()
    }

    pub fn viewport_size(&self) -> Point {
        self.viewport.size()
    }

    /// Number of tile keys intersecting the current viewport.
    pub fn visible_tile_count(&self) -> usize {
        self.visible_keys().len()
    }

    /// Number of decoded tiles currently cached.
    pub fn cached_tile_count(&self) -> usize {
        self.cache.len()
    }

    /// Produces the per-frame snapshot: pumps completed fetches into the
    /// cache, requests any newly visible tiles and returns one
    /// [`TileFrame`] per visible key. Never blocks on pending fetches.
    pub fn render_snapshot(&mut self) -> Vec<TileFrame> {
        if self.product.is_none() {
            return Vec::new();
        }
        self.coordinator.pump(&mut self.cache);

        let visible = self.visible_keys();
        self.reconcile_keys(&visible);

        let pan = self.viewport.pan();
        visible
            .into_iter()
            .map(|key| TileFrame {
                key,
                rect: grid::tile_screen_rect(key, pan),
                paint: TilePaint::for_key(&self.cache, &key),
            })
            .collect()
    }

    fn visible_keys(&self) -> Vec<TileKey> {
        let size = self.viewport.size();
        grid::visible_tiles(self.viewport.zoom(), self.viewport.pan(), size.x, size.y)
    }

    fn invalidate_and_refetch(&mut self) {
        // Tile identity is zoom-relative; every cached key is stale now.
        self.cache.invalidate_all();
        self.reconcile();
    }

    fn reconcile(&mut self) {
        let visible = self.visible_keys();
        self.reconcile_keys(&visible);
    }

    fn reconcile_keys(&mut self, visible: &[TileKey]) {
        if let Some(product) = &self.product {
            self.coordinator
                .reconcile(&mut self.cache, &product.id, visible);
        }
    }
}
