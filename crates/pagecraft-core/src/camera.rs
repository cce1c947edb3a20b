//! Camera module for pan/zoom state.

use crate::coords::{CoordinateTransform, ViewSource};
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest scale change `set_scale` will act on.
const SCALE_EPSILON: f64 = 0.00001;

/// Base of the exponential wheel zoom.
const WHEEL_ZOOM_BASE: f64 = 1.01;

/// Camera holds the pan offset, zoom scale and the device-space frame of the
/// viewport.
///
/// Pan is the translation of content space inside the viewport, so a content
/// point `c` lands at viewport point `pan + c * scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub pan: Vec2,
    pub scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Increment used by `zoom_in` / `zoom_out`.
    pub scale_step: f64,
    /// Viewport frame in device space.
    pub frame: Rect,
    #[serde(skip)]
    pan_session: Option<PanSession>,
}

/// An in-progress pan gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanSession {
    pub last_device: Point,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            scale: 1.0,
            min_scale: 0.1,
            max_scale: 3.0,
            scale_step: 0.1,
            frame: Rect::ZERO,
            pan_session: None,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// A default camera with custom zoom bounds and step.
    pub fn with_limits(min_scale: f64, max_scale: f64, scale_step: f64) -> Self {
        Self {
            min_scale,
            max_scale,
            scale_step,
            ..Self::default()
        }
    }

    /// Current view transform.
    pub fn transform(&self) -> CoordinateTransform {
        CoordinateTransform::from_view(self)
    }

    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    /// Change the scale while keeping the viewport point `center` fixed.
    /// Without a center the middle of the frame is used.
    pub fn set_scale(&mut self, scale: f64, center: Option<Point>) {
        let old = self.scale;
        let new = scale.clamp(self.min_scale, self.max_scale);
        if (new - old).abs() < SCALE_EPSILON {
            return;
        }
        let center = center.unwrap_or_else(|| {
            Point::new(self.frame.width() / 2.0, self.frame.height() / 2.0)
        });
        let factor = if old > 0.0 { new / old } else { 1.0 };
        self.pan += (center.to_vec2() - self.pan) * (1.0 - factor);
        self.scale = new;
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale + self.scale_step, None);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale - self.scale_step, None);
    }

    pub fn reset_zoom(&mut self) {
        self.set_scale(1.0, None);
    }

    /// Apply a wheel or trackpad gesture at a device-space position.
    ///
    /// With the zoom modifier held the scale changes exponentially with the
    /// vertical delta around the pointer; otherwise the view pans.
    pub fn handle_wheel(&mut self, device: Point, delta: Vec2, zoom_modifier: bool, pixel_ratio: f64) {
        if zoom_modifier {
            let factor = WHEEL_ZOOM_BASE.powf(-delta.y);
            let center = device - self.frame.origin().to_vec2();
            self.set_scale(self.scale * factor, Some(center));
            return;
        }
        let ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        self.pan -= delta / ratio;
    }

    /// Fit a canvas of the given size inside the frame, never zooming past
    /// 100%, and center it.
    pub fn fit_canvas(&mut self, canvas: Size, padding: f64) {
        if canvas.width <= 0.0 || canvas.height <= 0.0 {
            return;
        }
        let available_w = self.frame.width() - padding * 2.0;
        let available_h = self.frame.height() - padding * 2.0;
        let fit = (available_w / canvas.width)
            .min(available_h / canvas.height)
            .min(1.0)
            .max(self.min_scale);
        self.scale = fit;
        self.pan = Vec2::new(
            (self.frame.width() - canvas.width * fit) / 2.0,
            (self.frame.height() - canvas.height * fit) / 2.0,
        );
    }

    pub fn begin_pan(&mut self, device: Point) {
        self.pan_session = Some(PanSession { last_device: device });
    }

    /// Move the view with the pointer. Returns false when no pan is active.
    pub fn update_pan(&mut self, device: Point) -> bool {
        let Some(session) = self.pan_session.as_mut() else {
            return false;
        };
        self.pan += device - session.last_device;
        session.last_device = device;
        true
    }

    pub fn end_pan(&mut self) {
        self.pan_session = None;
    }

    pub fn is_panning(&self) -> bool {
        self.pan_session.is_some()
    }
}

impl ViewSource for Camera {
    fn scale(&self) -> f64 {
        self.scale
    }

    fn pan(&self) -> Vec2 {
        self.pan
    }

    fn frame_origin(&self) -> Point {
        self.frame.origin()
    }
}
