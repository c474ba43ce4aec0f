//! Canvas input normalization.
//!
//! Hosts deliver pointer, touch and keyboard events in whatever shape
//! their windowing layer produces; this module is the single place they
//! are normalized before tool dispatch. Tools see one canvas-space point
//! per positional event regardless of input device.

use crate::geometry::CanvasPoint;

/// Result of a tool callback, controlling event propagation.
/// `Stop` means the event was consumed and must not reach later handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: CanvasPoint,
    pub button: MouseButton,
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

impl PointerEvent {
    /// Plain unmodified left-button event at `position`.
    pub fn left(position: CanvasPoint) -> Self {
        Self {
            position,
            button: MouseButton::Left,
            shift: false,
            alt: false,
            ctrl: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    /// Active touch points; the first is the gesture anchor.
    pub touches: Vec<CanvasPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Normalized key name ("escape", "enter", "1", ...).
    pub key: String,
    pub shift: bool,
    pub ctrl: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    Pointer(PointerEvent),
    Touch(TouchEvent),
    Key(KeyEvent),
}

/// The canvas-space point carried by a positional event. Key events and
/// empty touch sets have none.
pub fn resolve_event_point(event: &CanvasEvent) -> Option<CanvasPoint> {
    match event {
        CanvasEvent::Pointer(pointer) => Some(pointer.position),
        CanvasEvent::Touch(touch) => touch.touches.first().copied(),
        CanvasEvent::Key(_) => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_event_point() {
        let pointer = CanvasEvent::Pointer(PointerEvent::left(CanvasPoint::new(3.0, 4.0)));
        assert_eq!(resolve_event_point(&pointer), Some(CanvasPoint::new(3.0, 4.0)));

        let touch = CanvasEvent::Touch(TouchEvent {
            touches: vec![CanvasPoint::new(1.0, 1.0), CanvasPoint::new(9.0, 9.0)],
        });
        assert_eq!(resolve_event_point(&touch), Some(CanvasPoint::new(1.0, 1.0)));

        let empty = CanvasEvent::Touch(TouchEvent { touches: vec![] });
        assert_eq!(resolve_event_point(&empty), None);

        let key = CanvasEvent::Key(KeyEvent {
            key: "escape".into(),
            shift: false,
            ctrl: false,
        });
        assert_eq!(resolve_event_point(&key), None);
    }
}
