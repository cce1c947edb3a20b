//! Resize handles and the resize gesture.

use crate::coords::CoordinateTransform;
use crate::node::{ComponentNode, Props, Sizing, prop};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest width or height a resize can produce.
pub const MIN_SIZE: f64 = 1.0;

/// Handle hit tolerance in device pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 6.0;

/// Which handles a component type exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeProfile {
    /// All eight handles.
    #[default]
    Free,
    /// Left and right edges only.
    Horizontal,
    /// Not resizable.
    None,
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// A resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Corner(Corner),
    Edge(Edge),
}

impl HandleKind {
    pub const ALL: [HandleKind; 8] = [
        HandleKind::Corner(Corner::TopLeft),
        HandleKind::Edge(Edge::Top),
        HandleKind::Corner(Corner::TopRight),
        HandleKind::Edge(Edge::Right),
        HandleKind::Corner(Corner::BottomRight),
        HandleKind::Edge(Edge::Bottom),
        HandleKind::Corner(Corner::BottomLeft),
        HandleKind::Edge(Edge::Left),
    ];

    /// Whether dragging this handle changes the width.
    pub fn affects_width(self) -> bool {
        !matches!(self, HandleKind::Edge(Edge::Top) | HandleKind::Edge(Edge::Bottom))
    }

    /// Whether dragging this handle changes the height.
    pub fn affects_height(self) -> bool {
        !matches!(self, HandleKind::Edge(Edge::Left) | HandleKind::Edge(Edge::Right))
    }

    /// The left edge follows the pointer; the right edge stays put.
    fn moves_left(self) -> bool {
        matches!(
            self,
            HandleKind::Corner(Corner::TopLeft) | HandleKind::Corner(Corner::BottomLeft) | HandleKind::Edge(Edge::Left)
        )
    }

    fn moves_top(self) -> bool {
        matches!(
            self,
            HandleKind::Corner(Corner::TopLeft) | HandleKind::Corner(Corner::TopRight) | HandleKind::Edge(Edge::Top)
        )
    }

    /// Where the handle sits on `bounds`.
    pub fn position(self, bounds: Rect) -> Point {
        let center = bounds.center();
        match self {
            HandleKind::Corner(Corner::TopLeft) => Point::new(bounds.x0, bounds.y0),
            HandleKind::Corner(Corner::TopRight) => Point::new(bounds.x1, bounds.y0),
            HandleKind::Corner(Corner::BottomLeft) => Point::new(bounds.x0, bounds.y1),
            HandleKind::Corner(Corner::BottomRight) => Point::new(bounds.x1, bounds.y1),
            HandleKind::Edge(Edge::Top) => Point::new(center.x, bounds.y0),
            HandleKind::Edge(Edge::Right) => Point::new(bounds.x1, center.y),
            HandleKind::Edge(Edge::Bottom) => Point::new(center.x, bounds.y1),
            HandleKind::Edge(Edge::Left) => Point::new(bounds.x0, center.y),
        }
    }
}

/// A handle with its content-space position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// Handles allowed by `profile`, minus the ones on auto-sized axes.
///
/// An auto width removes the left and right edges and every corner; an auto
/// height removes the top and bottom edges and every corner.
pub fn active_handles(profile: ResizeProfile, auto_width: bool, auto_height: bool) -> Vec<HandleKind> {
    let allowed: &[HandleKind] = match profile {
        ResizeProfile::Free => &HandleKind::ALL,
        ResizeProfile::Horizontal => &[HandleKind::Edge(Edge::Right), HandleKind::Edge(Edge::Left)],
        ResizeProfile::None => &[],
    };
    allowed
        .iter()
        .copied()
        .filter(|h| !(auto_width && h.affects_width()) && !(auto_height && h.affects_height()))
        .collect()
}

/// Handles of `node` placed on its content-space `bounds`.
pub fn handles_for(node: &ComponentNode, profile: ResizeProfile, bounds: Rect) -> Vec<Handle> {
    active_handles(profile, node.auto_width(), node.auto_height())
        .into_iter()
        .map(|kind| Handle {
            position: kind.position(bounds),
            kind,
        })
        .collect()
}

/// First handle within `tolerance` of `point`.
pub fn hit_test_handles(handles: &[Handle], point: Point, tolerance: f64) -> Option<HandleKind> {
    handles.iter().find(|h| h.hit_test(point, tolerance)).map(|h| h.kind)
}

/// New geometry produced by one resize step. Only the keys the handle
/// touches are set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResizeUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl ResizeUpdate {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.width.is_none() && self.height.is_none()
    }

    pub fn to_props(&self) -> Props {
        let mut props = Props::new();
        for (key, value) in [
            (prop::X, self.x),
            (prop::Y, self.y),
            (prop::WIDTH, self.width),
            (prop::HEIGHT, self.height),
        ] {
            if let Some(value) = value {
                props.insert(key.to_string(), value.into());
            }
        }
        props
    }
}

/// An active resize gesture.
#[derive(Debug, Clone)]
pub struct ResizeSession {
    pub node_id: String,
    pub handle: HandleKind,
    pub pointer_id: Option<u32>,
    /// Pointer position at the start, in device pixels.
    pub start_device: Point,
    /// Stored `x,y` and effective size at the start.
    pub start_bounds: Rect,
    lock_width: bool,
    lock_height: bool,
    min_size: f64,
}

impl ResizeSession {
    pub fn new(node: &ComponentNode, handle: HandleKind, start_device: Point, pointer_id: Option<u32>, min_size: f64) -> Self {
        Self {
            node_id: node.id.clone(),
            handle,
            pointer_id,
            start_device,
            start_bounds: Rect::from_origin_size(node.position(), node.effective_size()),
            lock_width: node.width_sizing() == Sizing::Fill,
            lock_height: node.height_sizing() == Sizing::Fill,
            min_size: min_size.max(0.0),
        }
    }

    /// Whether the message belongs to this gesture.
    pub fn accepts(&self, pointer_id: Option<u32>) -> bool {
        self.pointer_id.is_none() || pointer_id.is_none() || self.pointer_id == pointer_id
    }

    /// Geometry for the pointer at `device`. Fill axes are left untouched.
    pub fn update(&self, device: Point, transform: &CoordinateTransform) -> ResizeUpdate {
        let delta: Vec2 = transform.delta_to_content(device - self.start_device);
        resize_bounds(
            self.start_bounds,
            self.handle,
            delta,
            self.min_size,
            (self.lock_width, self.lock_height),
        )
    }

    pub fn start_size(&self) -> Size {
        self.start_bounds.size()
    }
}

/// Apply `delta` to `start` through `handle`. The opposite edge stays fixed
/// and each dimension is clamped to `min_size`.
pub fn resize_bounds(start: Rect, handle: HandleKind, delta: Vec2, min_size: f64, locks: (bool, bool)) -> ResizeUpdate {
    let (lock_width, lock_height) = locks;
    let mut update = ResizeUpdate::default();

    if handle.affects_width() && !lock_width {
        if handle.moves_left() {
            let width = (start.width() - delta.x).max(min_size);
            update.width = Some(width);
            update.x = Some(start.x0 + start.width() - width);
        } else {
            update.width = Some((start.width() + delta.x).max(min_size));
        }
    }
    if handle.affects_height() && !lock_height {
        if handle.moves_top() {
            let height = (start.height() - delta.y).max(min_size);
            update.height = Some(height);
            update.y = Some(start.y0 + start.height() - height);
        } else {
            update.height = Some((start.height() + delta.y).max(min_size));
        }
    }
    update
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    fn start() -> Rect {
        Rect::new(100.0, 100.0, 300.0, 200.0)
    }

    #[test]
    fn test_bottom_right_grows_size_only() {
        let u = resize_bounds(start(), HandleKind::Corner(Corner::BottomRight), Vec2::new(20.0, 10.0), MIN_SIZE, (false, false));
        assert_eq!(u.x, None);
        assert_eq!(u.y, None);
        assert!((u.width.unwrap() - 220.0).abs() < f64::EPSILON);
        assert!((u.height.unwrap() - 110.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_top_left_keeps_opposite_corner() {
        let u = resize_bounds(start(), HandleKind::Corner(Corner::TopLeft), Vec2::new(50.0, -20.0), MIN_SIZE, (false, false));
        assert!((u.width.unwrap() - 150.0).abs() < f64::EPSILON);
        assert!((u.x.unwrap() - 150.0).abs() < f64::EPSILON);
        assert!((u.height.unwrap() - 120.0).abs() < f64::EPSILON);
        assert!((u.y.unwrap() - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clamps_to_min_size() {
        let u = resize_bounds(start(), HandleKind::Corner(Corner::TopLeft), Vec2::new(500.0, 500.0), MIN_SIZE, (false, false));
        assert!((u.width.unwrap() - 1.0).abs() < f64::EPSILON);
        assert!((u.x.unwrap() - 299.0).abs() < f64::EPSILON);
        assert!((u.height.unwrap() - 1.0).abs() < f64::EPSILON);
        assert!((u.y.unwrap() - 199.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_edges_touch_one_axis() {
        let u = resize_bounds(start(), HandleKind::Edge(Edge::Right), Vec2::new(30.0, 99.0), MIN_SIZE, (false, false));
        assert_eq!(u.height, None);
        assert!((u.width.unwrap() - 230.0).abs() < f64::EPSILON);

        let u = resize_bounds(start(), HandleKind::Edge(Edge::Top), Vec2::new(30.0, 10.0), MIN_SIZE, (false, false));
        assert_eq!(u.width, None);
        assert!((u.height.unwrap() - 90.0).abs() < f64::EPSILON);
        assert!((u.y.unwrap() - 110.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fill_axis_is_locked() {
        let u = resize_bounds(start(), HandleKind::Corner(Corner::BottomRight), Vec2::new(20.0, 10.0), MIN_SIZE, (true, false));
        assert_eq!(u.width, None);
        assert!(u.height.is_some());
    }

    #[test]
    fn test_auto_axes_suppress_handles() {
        assert_eq!(active_handles(ResizeProfile::Free, false, false).len(), 8);
        assert_eq!(
            active_handles(ResizeProfile::Free, true, false),
            vec![HandleKind::Edge(Edge::Top), HandleKind::Edge(Edge::Bottom)]
        );
        assert_eq!(
            active_handles(ResizeProfile::Free, false, true),
            vec![HandleKind::Edge(Edge::Right), HandleKind::Edge(Edge::Left)]
        );
        assert!(active_handles(ResizeProfile::Horizontal, true, false).is_empty());
        assert!(active_handles(ResizeProfile::None, false, false).is_empty());
    }

    #[test]
    fn test_session_converts_device_delta() {
        let node = ComponentNode::new("a", "text").with_rect(100.0, 100.0, 200.0, 100.0);
        let session = ResizeSession::new(&node, HandleKind::Corner(Corner::BottomRight), Point::new(500.0, 500.0), Some(1), MIN_SIZE);
        let transform = CoordinateTransform::new(2.0, Vec2::ZERO, Point::ZERO);
        let u = session.update(Point::new(540.0, 520.0), &transform);
        assert!((u.width.unwrap() - 220.0).abs() < f64::EPSILON);
        assert!((u.height.unwrap() - 110.0).abs() < f64::EPSILON);
        assert!(session.accepts(Some(1)));
        assert!(!session.accepts(Some(2)));
    }

    #[test]
    fn test_hit_test_handles() {
        let node = ComponentNode::new("a", "text").with_rect(0.0, 0.0, 100.0, 50.0);
        let handles = handles_for(&node, ResizeProfile::Free, Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(
            hit_test_handles(&handles, Point::new(102.0, 49.0), HANDLE_HIT_TOLERANCE),
            Some(HandleKind::Corner(Corner::BottomRight))
        );
        assert_eq!(hit_test_handles(&handles, Point::new(50.0, 25.0), HANDLE_HIT_TOLERANCE), None);
    }
}
