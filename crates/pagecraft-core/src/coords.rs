//! Conversions between device, viewport and content space.
//!
//! Device space is what the pointer reports. Viewport space is relative to the
//! editor frame's top-left corner. Content space is where component geometry
//! lives and does not depend on pan or zoom.

use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// One of the three coordinate spaces of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    Device,
    Viewport,
    Content,
}

/// Provides the current view state a transform is built from.
///
/// The camera is the usual implementor; tests and embedders can supply their
/// own so transforms are always recomputed from current values.
pub trait ViewSource {
    /// Current zoom factor.
    fn scale(&self) -> f64;
    /// Translation of content space inside the viewport.
    fn pan(&self) -> Vec2;
    /// Device-space origin of the viewport frame.
    fn frame_origin(&self) -> Point;
}

/// Inverts an affine matrix, falling back to identity when it is singular.
pub fn invert_or_identity(affine: Affine) -> Affine {
    let det = affine.determinant();
    if det == 0.0 || !det.is_finite() {
        return Affine::IDENTITY;
    }
    affine.inverse()
}

/// A point expressed in all three spaces at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSnapshot {
    pub device: Point,
    pub viewport: Point,
    pub content: Point,
}

impl CoordinateSnapshot {
    pub fn get(&self, space: Space) -> Point {
        match space {
            Space::Device => self.device,
            Space::Viewport => self.viewport,
            Space::Content => self.content,
        }
    }
}

/// An immutable view transform captured from a [`ViewSource`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransform {
    pub scale: f64,
    pub pan: Vec2,
    pub frame_origin: Point,
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan: Vec2::ZERO,
            frame_origin: Point::ZERO,
        }
    }
}

impl CoordinateTransform {
    pub fn new(scale: f64, pan: Vec2, frame_origin: Point) -> Self {
        Self {
            scale,
            pan,
            frame_origin,
        }
    }

    /// Capture the current values of a view source.
    pub fn from_view(view: &impl ViewSource) -> Self {
        Self::new(view.scale(), view.pan(), view.frame_origin())
    }

    pub fn content_to_viewport(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.scale)
    }

    pub fn viewport_to_device(&self) -> Affine {
        Affine::translate(self.frame_origin.to_vec2())
    }

    pub fn content_to_device(&self) -> Affine {
        self.viewport_to_device() * self.content_to_viewport()
    }

    /// The matrix mapping points in `from` to points in `to`.
    pub fn matrix(&self, from: Space, to: Space) -> Affine {
        use Space::*;
        match (from, to) {
            (Content, Viewport) => self.content_to_viewport(),
            (Viewport, Device) => self.viewport_to_device(),
            (Content, Device) => self.content_to_device(),
            (Viewport, Content) => invert_or_identity(self.content_to_viewport()),
            (Device, Viewport) => invert_or_identity(self.viewport_to_device()),
            (Device, Content) => invert_or_identity(self.content_to_device()),
            _ => Affine::IDENTITY,
        }
    }

    pub fn convert(&self, point: Point, from: Space, to: Space) -> Point {
        self.matrix(from, to) * point
    }

    /// Convert a rectangle. Only translation and scale are involved, so the
    /// bounding box of the mapped rectangle is exact.
    pub fn convert_rect(&self, rect: Rect, from: Space, to: Space) -> Rect {
        self.matrix(from, to).transform_rect_bbox(rect)
    }

    pub fn device_to_content(&self, point: Point) -> Point {
        self.convert(point, Space::Device, Space::Content)
    }

    pub fn content_to_device_point(&self, point: Point) -> Point {
        self.convert(point, Space::Content, Space::Device)
    }

    /// Scale a device-space delta into content space. No translation is
    /// applied since deltas are directions, not positions.
    pub fn delta_to_content(&self, delta: Vec2) -> Vec2 {
        let scale = if self.scale > 0.0 && self.scale.is_finite() {
            self.scale
        } else {
            1.0
        };
        delta / scale
    }

    /// Express a point given in `space` in all three spaces.
    pub fn snapshot(&self, point: Point, space: Space) -> CoordinateSnapshot {
        CoordinateSnapshot {
            device: self.convert(point, space, Space::Device),
            viewport: self.convert(point, space, Space::Viewport),
            content: self.convert(point, space, Space::Content),
        }
    }
}

impl ViewSource for CoordinateTransform {
    fn scale(&self) -> f64 {
        self.scale
    }

    fn pan(&self) -> Vec2 {
        self.pan
    }

    fn frame_origin(&self) -> Point {
        self.frame_origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS
    }

    fn sample() -> CoordinateTransform {
        CoordinateTransform::new(2.0, Vec2::new(30.0, -10.0), Point::new(100.0, 50.0))
    }

    #[test]
    fn test_content_to_device() {
        let t = sample();
        let p = t.convert(Point::new(10.0, 20.0), Space::Content, Space::Device);
        assert!(close(p, Point::new(150.0, 80.0)));
        let v = t.convert(Point::new(10.0, 20.0), Space::Content, Space::Viewport);
        assert!(close(v, Point::new(50.0, 30.0)));
    }

    #[test]
    fn test_round_trip_all_pairs() {
        let spaces = [Space::Device, Space::Viewport, Space::Content];
        for scale in [0.1, 0.75, 1.0, 3.0] {
            let t = CoordinateTransform::new(scale, Vec2::new(-42.5, 17.0), Point::new(8.0, 64.0));
            let p = Point::new(123.25, -7.5);
            for from in spaces {
                for to in spaces {
                    let there = t.convert(p, from, to);
                    let back = t.convert(there, to, from);
                    assert!(close(p, back), "{from:?} -> {to:?} at scale {scale}");
                }
            }
        }
    }

    #[test]
    fn test_delta_ignores_translation() {
        let t = sample();
        let d = t.delta_to_content(Vec2::new(10.0, -4.0));
        assert!((d.x - 5.0).abs() < EPS);
        assert!((d.y + 2.0).abs() < EPS);
    }

    #[test]
    fn test_delta_linearity() {
        let t = CoordinateTransform::new(1.7, Vec2::new(3.0, 4.0), Point::ZERO);
        let d = Vec2::new(13.0, -9.0);
        for k in [-2.0, 0.0, 0.5, 3.0] {
            let lhs = t.delta_to_content(d * k);
            let rhs = t.delta_to_content(d) * k;
            assert!((lhs.x - rhs.x).abs() < EPS);
            assert!((lhs.y - rhs.y).abs() < EPS);
        }
    }

    #[test]
    fn test_zero_scale_delta_falls_back() {
        let t = CoordinateTransform::new(0.0, Vec2::ZERO, Point::ZERO);
        let d = t.delta_to_content(Vec2::new(4.0, 2.0));
        assert!((d.x - 4.0).abs() < EPS);
    }

    #[test]
    fn test_singular_inverse_is_identity() {
        let singular = Affine::scale(0.0);
        assert_eq!(invert_or_identity(singular), Affine::IDENTITY);
        let t = CoordinateTransform::new(0.0, Vec2::new(5.0, 5.0), Point::ZERO);
        let p = Point::new(9.0, 9.0);
        assert!(close(t.convert(p, Space::Viewport, Space::Content), p));
    }

    #[test]
    fn test_snapshot_consistent() {
        let t = sample();
        let snap = t.snapshot(Point::new(150.0, 80.0), Space::Device);
        assert!(close(snap.content, Point::new(10.0, 20.0)));
        assert!(close(snap.viewport, Point::new(50.0, 30.0)));
        assert!(close(snap.get(Space::Device), Point::new(150.0, 80.0)));
    }

    #[test]
    fn test_convert_rect() {
        let t = sample();
        let r = t.convert_rect(Rect::new(0.0, 0.0, 10.0, 5.0), Space::Content, Space::Viewport);
        assert!((r.x0 - 30.0).abs() < EPS);
        assert!((r.width() - 20.0).abs() < EPS);
        assert!((r.height() - 10.0).abs() < EPS);
    }
}
