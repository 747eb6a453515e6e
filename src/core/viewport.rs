//! Manages the current view of the pyramid: integer zoom level, pan offset
//! and viewport pixel size, plus the transient drag session.
//!
//! The controller is single-owner, single-writer: only the owning
//! [`crate::Viewer`] mutates it, and every mutation is synchronous. Zoom
//! changes are quantized to integers in `[0, max_zoom]` and anchored at the
//! viewport center.

use crate::core::grid::{self, Point};

/// Transient state of an in-progress drag.
#[derive(Debug, Clone, Copy)]
struct DragSession {
    anchor_screen: Point,
    anchor_pan: Point,
}

/// Owns `(zoom, pan)` and applies drag/wheel/resize deltas.
#[derive(Debug, Clone)]
pub struct ViewportController {
    zoom: u8,
    max_zoom: u8,
    pan: Point,
    size: Point,
    drag: Option<DragSession>,
}

impl ViewportController {
    /// Creates a controller for a viewport of the given pixel size.
    /// A `max_zoom` beyond [`grid::MAX_ZOOM`] is clamped, not trusted.
    pub fn new(size: Point, max_zoom: u8) -> Self {
        Self {
            zoom: 0,
            max_zoom: max_zoom.min(grid::MAX_ZOOM),
            pan: Point::default(),
            size,
            drag: None,
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    pub fn size(&self) -> Point {
        self.size
    }

    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    /// Records the drag anchors. No cache effect.
    pub fn start_drag(&mut self, screen_point: Point) {
        self.drag = Some(DragSession {
            anchor_screen: screen_point,
            anchor_pan: self.pan,
        });
    }

    /// Moves the pan by the delta from the drag anchor. Returns `true` when
    /// a drag session is active and the pan actually moved.
    pub fn drag_to(&mut self, screen_point: Point) -> bool {
        let Some(session) = self.drag else {
            return false;
        };
        self.pan = Point::new(
            session.anchor_pan.x + (screen_point.x - session.anchor_screen.x),
            session.anchor_pan.y + (screen_point.y - session.anchor_screen.y),
        );
        true
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Sets the zoom level, clamping to `[0, max_zoom]` and anchoring the
    /// change at the viewport center.
    ///
    /// Returns `true` when the zoom actually changed; the caller must then
    /// invalidate the tile cache, since tile identity is zoom-relative.
    /// Out-of-range targets are clamped, never rejected.
    pub fn set_zoom(&mut self, target: u8) -> bool {
        let target = target.min(self.max_zoom);
        if target == self.zoom {
            return false;
        }
        let center = Point::new(self.size.x / 2.0, self.size.y / 2.0);
        self.pan = grid::zoom_anchored_at_center(self.zoom, target, self.pan, center);
        self.zoom = target;
        self.drag = None;
        true
    }

    /// Steps the zoom by a signed number of levels (wheel input).
    pub fn zoom_by(&mut self, steps: i32) -> bool {
        let target = (self.zoom as i32 + steps).clamp(0, self.max_zoom as i32) as u8;
        self.set_zoom(target)
    }

    /// Resets to the baseline view for a product: `initial_zoom` (clamped)
    /// with the grid extent centered in the viewport.
    pub fn reset(&mut self, max_zoom: u8, initial_zoom: u8) {
        self.max_zoom = max_zoom.min(grid::MAX_ZOOM);
        self.zoom = initial_zoom.min(self.max_zoom);
        let extent = grid::grid_extent(self.zoom);
        self.pan = Point::new((self.size.x - extent) / 2.0, (self.size.y - extent) / 2.0);
        self.drag = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ViewportController {
        ViewportController::new(Point::new(1024.0, 768.0), 7)
    }

    #[test]
    fn test_drag_applies_delta_from_anchor() {
        let mut vc = controller();
        vc.start_drag(Point::new(100.0, 100.0));
        assert!(vc.drag_to(Point::new(130.0, 80.0)));
        assert_eq!(vc.pan(), Point::new(30.0, -20.0));
        // A second move is still relative to the original anchor.
        assert!(vc.drag_to(Point::new(90.0, 110.0)));
        assert_eq!(vc.pan(), Point::new(-10.0, 10.0));
        vc.end_drag();
        assert!(!vc.drag_to(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_set_zoom_clamps_and_noops() {
        let mut vc = controller();
        assert!(vc.set_zoom(3));
        assert_eq!(vc.zoom(), 3);
        // Equal target is a no-op.
        assert!(!vc.set_zoom(3));
        // Above max_zoom clamps to max_zoom rather than rejecting.
        assert!(vc.set_zoom(20));
        assert_eq!(vc.zoom(), 7);
    }

    #[test]
    fn test_set_zoom_anchors_at_center() {
        let mut vc = controller();
        assert!(vc.set_zoom(1));
        // Bring the pan back to the origin before zooming.
        vc.start_drag(Point::new(0.0, 0.0));
        vc.drag_to(Point::new(-vc.pan().x, -vc.pan().y));
        vc.end_drag();
        assert_eq!(vc.pan(), Point::new(0.0, 0.0));

        assert!(vc.set_zoom(2));
        assert_eq!(vc.pan(), Point::new(-512.0, -384.0));
    }

    #[test]
    fn test_max_zoom_clamps_to_supported_depth() {
        let mut vc = ViewportController::new(Point::new(1024.0, 768.0), 40);
        assert_eq!(vc.max_zoom(), grid::MAX_ZOOM);
        vc.reset(40, 1);
        assert!(vc.set_zoom(40));
        assert_eq!(vc.zoom(), grid::MAX_ZOOM);
    }

    #[test]
    fn test_zoom_by_steps() {
        let mut vc = controller();
        assert!(vc.zoom_by(2));
        assert_eq!(vc.zoom(), 2);
        assert!(vc.zoom_by(-5));
        assert_eq!(vc.zoom(), 0);
        assert!(!vc.zoom_by(0));
    }

    #[test]
    fn test_reset_centers_grid() {
        let mut vc = controller();
        vc.reset(7, 1);
        assert_eq!(vc.zoom(), 1);
        // Grid extent at zoom 1 is 512 px.
        assert_eq!(vc.pan(), Point::new((1024.0 - 512.0) / 2.0, (768.0 - 512.0) / 2.0));

        // Initial zoom clamps to a shallow product's max_zoom.
        vc.reset(0, 1);
        assert_eq!(vc.zoom(), 0);
    }
}
