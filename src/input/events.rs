//! Normalized input events consumed by the viewer.
//!
//! Mouse, touch and any other pointer front-end reduce their raw events to
//! this common vocabulary; the viewer never knows which device produced
//! them.

use serde::{Deserialize, Serialize};

use crate::core::grid::Point;

/// Input events that mutate the viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Start of a drag operation.
    DragStart { position: Point },
    /// Pointer moved while dragging.
    Drag { position: Point },
    /// End of a drag operation.
    DragEnd,
    /// Scroll wheel or pinch zoom; positive delta zooms in. The zoom is
    /// anchored at the viewport center regardless of `position`.
    Scroll { delta: f64, position: Point },
    /// Viewport resize.
    Resize { size: Point },
}

impl InputEvent {
    /// Gets the screen position associated with this event, if any.
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::DragStart { position }
            | InputEvent::Drag { position }
            | InputEvent::Scroll { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// A device front-end (mouse, touch) that yields normalized events.
pub trait PointerInputSource {
    /// Drains the events accumulated since the last poll, in order.
    fn poll_events(&mut self) -> Vec<InputEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_position() {
        let drag = InputEvent::Drag {
            position: Point::new(12.0, 34.0),
        };
        assert_eq!(drag.position(), Some(Point::new(12.0, 34.0)));
        assert_eq!(InputEvent::DragEnd.position(), None);
    }
}
