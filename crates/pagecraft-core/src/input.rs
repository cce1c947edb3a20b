//! Normalized pointer input.
//!
//! Hosts translate their platform events into [`PointerEvent`]s and feed them
//! to a [`PointerHub`], which tracks pressed state and produces the
//! [`PointerMessage`] stream the editing sessions consume.

use crate::coords::{CoordinateSnapshot, CoordinateTransform, Space};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PointerKind {
    Move,
    Down,
    Up,
    Cancel,
    EnterStage,
    LeaveStage,
}

impl PointerKind {
    /// Up and cancel both end a gesture.
    pub fn ends_gesture(self) -> bool {
        matches!(self, PointerKind::Up | PointerKind::Cancel)
    }
}

/// Raw pointer event as delivered by the host, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub position: Point,
    #[serde(default)]
    pub button: MouseButton,
    #[serde(default)]
    pub pointer_id: Option<u32>,
    /// Host clock in milliseconds. Drives the hover-activation delay.
    #[serde(default)]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, position: Point, timestamp_ms: u64) -> Self {
        Self {
            kind,
            position,
            button: MouseButton::Left,
            pointer_id: None,
            timestamp_ms,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_pointer_id(mut self, pointer_id: u32) -> Self {
        self.pointer_id = Some(pointer_id);
        self
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }
}

/// A pointer event with its position resolved in every coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerMessage {
    pub kind: PointerKind,
    pub position: CoordinateSnapshot,
    /// Whether a button is held after this event.
    pub is_down: bool,
    pub button: MouseButton,
    pub pointer_id: Option<u32>,
    pub timestamp_ms: u64,
    pub modifiers: Modifiers,
}

impl PointerMessage {
    pub fn device(&self) -> Point {
        self.position.device
    }

    pub fn content(&self) -> Point {
        self.position.content
    }
}

/// Tracks pointer-down state and the space key used for panning.
#[derive(Debug, Clone, Default)]
pub struct PointerHub {
    is_down: bool,
    space_pressed: bool,
    latest: Option<PointerMessage>,
}

impl PointerHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_down(&self) -> bool {
        self.is_down
    }

    pub fn latest(&self) -> Option<&PointerMessage> {
        self.latest.as_ref()
    }

    pub fn set_space_pressed(&mut self, pressed: bool) {
        self.space_pressed = pressed;
    }

    pub fn space_pressed(&self) -> bool {
        self.space_pressed
    }

    /// Whether a press starts a canvas pan: middle button, or left button
    /// while space is held.
    pub fn starts_pan(&self, event: &PointerEvent) -> bool {
        event.kind == PointerKind::Down
            && (event.button == MouseButton::Middle || (event.button == MouseButton::Left && self.space_pressed))
    }

    /// Resolve `event` against the current view and update pressed state.
    pub fn process(&mut self, event: PointerEvent, transform: &CoordinateTransform) -> PointerMessage {
        match event.kind {
            PointerKind::Down => self.is_down = true,
            PointerKind::Up | PointerKind::Cancel => self.is_down = false,
            _ => {}
        }
        let message = PointerMessage {
            kind: event.kind,
            position: transform.snapshot(event.position, Space::Device),
            is_down: self.is_down,
            button: event.button,
            pointer_id: event.pointer_id,
            timestamp_ms: event.timestamp_ms,
            modifiers: event.modifiers,
        };
        self.latest = Some(message);
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    #[test]
    fn test_down_state_follows_events() {
        let transform = CoordinateTransform::default();
        let mut hub = PointerHub::new();
        let down = hub.process(PointerEvent::new(PointerKind::Down, Point::new(10.0, 10.0), 0), &transform);
        assert!(down.is_down);
        let moved = hub.process(PointerEvent::new(PointerKind::Move, Point::new(20.0, 10.0), 16), &transform);
        assert!(moved.is_down);
        let cancel = hub.process(PointerEvent::new(PointerKind::Cancel, Point::new(20.0, 10.0), 32), &transform);
        assert!(!cancel.is_down);
        assert!(!hub.is_down());
        assert_eq!(hub.latest().map(|m| m.kind), Some(PointerKind::Cancel));
    }

    #[test]
    fn test_message_carries_content_position() {
        let transform = CoordinateTransform::new(2.0, Vec2::new(10.0, 0.0), Point::new(100.0, 50.0));
        let mut hub = PointerHub::new();
        let msg = hub.process(PointerEvent::new(PointerKind::Move, Point::new(130.0, 70.0), 0), &transform);
        assert!((msg.content().x - 10.0).abs() < f64::EPSILON);
        assert!((msg.content().y - 10.0).abs() < f64::EPSILON);
        assert!((msg.device().x - 130.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pan_trigger() {
        let mut hub = PointerHub::new();
        let left = PointerEvent::new(PointerKind::Down, Point::ZERO, 0);
        assert!(!hub.starts_pan(&left));
        assert!(hub.starts_pan(&left.with_button(MouseButton::Middle)));
        hub.set_space_pressed(true);
        assert!(hub.starts_pan(&left));
    }
}
