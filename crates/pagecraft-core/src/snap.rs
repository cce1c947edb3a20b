//! Snap-alignment for dragged rectangles.
//!
//! Each axis is snapped independently against the left/right/center (or
//! top/bottom/center) lines of every sibling and then of the canvas.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Distance in content units within which two lines snap.
pub const SNAP_THRESHOLD: f64 = 5.0;

/// How far guide lines extend past the aligned rectangles.
pub const GUIDE_MARGIN: f64 = 20.0;

/// How a candidate is picked when several lie within the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapStrategy {
    /// First pair found wins: siblings in order, then canvas bounds.
    #[default]
    FirstMatch,
    /// Smallest distance wins; ties go to the earlier pair.
    Closest,
}

/// Snapping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapOptions {
    pub threshold: f64,
    pub guide_margin: f64,
    pub strategy: SnapStrategy,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self {
            threshold: SNAP_THRESHOLD,
            guide_margin: GUIDE_MARGIN,
            strategy: SnapStrategy::FirstMatch,
        }
    }
}

/// A rectangle other nodes can align to.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapTarget {
    pub id: String,
    pub rect: Rect,
}

impl SnapTarget {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self { id: id.into(), rect }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideOrientation {
    Vertical,
    Horizontal,
}

/// A guide segment shown while dragging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapLine {
    pub id: String,
    pub orientation: GuideOrientation,
    pub start: Point,
    pub end: Point,
}

/// Result of snapping a rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    /// Snapped top-left corner.
    pub position: Point,
    pub snapped_x: bool,
    pub snapped_y: bool,
    pub lines: Vec<SnapLine>,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(position: Point) -> Self {
        Self {
            position,
            snapped_x: false,
            snapped_y: false,
            lines: Vec::new(),
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

const X_KEYS: [&str; 3] = ["left", "right", "centerX"];
const Y_KEYS: [&str; 3] = ["top", "bottom", "centerY"];

fn x_points(rect: Rect) -> [f64; 3] {
    [rect.x0, rect.x1, rect.center().x]
}

fn y_points(rect: Rect) -> [f64; 3] {
    [rect.y0, rect.y1, rect.center().y]
}

/// Pick the offset that aligns one of `drag` to one of the candidate lines.
/// Candidates are given in priority order.
fn snap_axis(drag: [f64; 3], candidates: &[[f64; 3]], options: &SnapOptions) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for lines in candidates {
        for d in drag {
            for c in lines {
                let distance = (d - c).abs();
                if distance > options.threshold {
                    continue;
                }
                match options.strategy {
                    SnapStrategy::FirstMatch => return Some(c - d),
                    SnapStrategy::Closest => {
                        if best.is_none_or(|(bd, _)| distance < bd) {
                            best = Some((distance, c - d));
                        }
                    }
                }
            }
        }
    }
    best.map(|(_, offset)| offset)
}

/// Snap `drag` against sibling rectangles and the canvas bounds.
pub fn snap_rect(drag: Rect, targets: &[SnapTarget], canvas: Size, options: &SnapOptions) -> SnapResult {
    let canvas_rect = canvas.to_rect();

    let mut xs: Vec<[f64; 3]> = targets.iter().map(|t| x_points(t.rect)).collect();
    xs.push(x_points(canvas_rect));
    let mut ys: Vec<[f64; 3]> = targets.iter().map(|t| y_points(t.rect)).collect();
    ys.push(y_points(canvas_rect));

    let dx = snap_axis(x_points(drag), &xs, options);
    let dy = snap_axis(y_points(drag), &ys, options);

    let snapped = drag + kurbo::Vec2::new(dx.unwrap_or(0.0), dy.unwrap_or(0.0));
    SnapResult {
        position: snapped.origin(),
        snapped_x: dx.is_some(),
        snapped_y: dy.is_some(),
        lines: guide_lines(snapped, targets, canvas_rect, options),
    }
}

/// Guides for every line of `rect` that lines up with a target or the
/// canvas.
pub fn guide_lines(rect: Rect, targets: &[SnapTarget], canvas: Rect, options: &SnapOptions) -> Vec<SnapLine> {
    let aligned = |a: f64, b: f64| (a - b).abs() <= options.threshold;
    let margin = options.guide_margin;
    let mut lines = Vec::new();

    for target in targets {
        let other = target.rect;
        for (key, value) in X_KEYS.iter().zip(x_points(other)) {
            if x_points(rect).iter().any(|&d| aligned(d, value)) {
                lines.push(SnapLine {
                    id: format!("v-{}-{}", target.id, key),
                    orientation: GuideOrientation::Vertical,
                    start: Point::new(value, rect.y0.min(other.y0) - margin),
                    end: Point::new(value, rect.y1.max(other.y1) + margin),
                });
            }
        }
        for (key, value) in Y_KEYS.iter().zip(y_points(other)) {
            if y_points(rect).iter().any(|&d| aligned(d, value)) {
                lines.push(SnapLine {
                    id: format!("h-{}-{}", target.id, key),
                    orientation: GuideOrientation::Horizontal,
                    start: Point::new(rect.x0.min(other.x0) - margin, value),
                    end: Point::new(rect.x1.max(other.x1) + margin, value),
                });
            }
        }
    }

    for (key, value) in X_KEYS.iter().zip(x_points(canvas)) {
        if x_points(rect).iter().any(|&d| aligned(d, value)) {
            lines.push(SnapLine {
                id: format!("canvas-v-{key}"),
                orientation: GuideOrientation::Vertical,
                start: Point::new(value, canvas.y0),
                end: Point::new(value, canvas.y1),
            });
        }
    }
    for (key, value) in Y_KEYS.iter().zip(y_points(canvas)) {
        if y_points(rect).iter().any(|&d| aligned(d, value)) {
            lines.push(SnapLine {
                id: format!("canvas-h-{key}"),
                orientation: GuideOrientation::Horizontal,
                start: Point::new(canvas.x0, value),
                end: Point::new(canvas.x1, value),
            });
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANVAS: Size = Size::new(1280.0, 800.0);

    fn target(x: f64, y: f64, w: f64, h: f64) -> SnapTarget {
        SnapTarget::new("t", Rect::new(x, y, x + w, y + h))
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let targets = [target(200.0, 300.0, 50.0, 50.0)];
        let drag = Rect::new(205.0, 420.0, 215.0, 437.0);
        let result = snap_rect(drag, &targets, CANVAS, &SnapOptions::default());
        assert!(result.snapped_x);
        assert!((result.position.x - 200.0).abs() < f64::EPSILON);

        let drag = Rect::new(205.001, 420.0, 215.001, 437.0);
        let result = snap_rect(drag, &targets, CANVAS, &SnapOptions::default());
        assert!(!result.snapped_x);
        assert!((result.position.x - 205.001).abs() < f64::EPSILON);
    }

    #[test]
    fn test_axes_snap_independently() {
        let targets = [target(100.0, 100.0, 100.0, 100.0)];
        // right edge 198 near target right 200; top 500 far from anything
        let drag = Rect::new(148.0, 500.0, 198.0, 530.0);
        let result = snap_rect(drag, &targets, CANVAS, &SnapOptions::default());
        assert!(result.snapped_x);
        assert!(!result.snapped_y);
        assert!((result.position.x - 150.0).abs() < f64::EPSILON);
        assert!((result.position.y - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_components_win_over_canvas() {
        // left edge 3 is near both a sibling at x=6 and the canvas at 0
        let targets = [target(6.0, 300.0, 40.0, 40.0)];
        let drag = Rect::new(3.0, 500.0, 33.0, 530.0);
        let result = snap_rect(drag, &targets, CANVAS, &SnapOptions::default());
        assert!((result.position.x - 6.0).abs() < f64::EPSILON);

        let closest = SnapOptions {
            strategy: SnapStrategy::Closest,
            ..SnapOptions::default()
        };
        // sibling at distance 3, canvas at distance 3: tie keeps the sibling
        let result = snap_rect(drag, &targets, CANVAS, &closest);
        assert!((result.position.x - 6.0).abs() < f64::EPSILON);
        // sibling at distance 4, canvas at 1
        let drag = Rect::new(1.0, 500.0, 31.0, 530.0);
        let targets = [target(5.0, 300.0, 40.0, 40.0)];
        let result = snap_rect(drag, &targets, CANVAS, &closest);
        assert!((result.position.x - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_canvas_center() {
        let drag = Rect::new(612.0, 200.0, 668.0, 220.0);
        let result = snap_rect(drag, &[], CANVAS, &SnapOptions::default());
        assert!(result.snapped_x);
        assert!((result.position.x - 612.0).abs() < f64::EPSILON);
        let drag = Rect::new(610.0, 200.0, 666.0, 220.0);
        let result = snap_rect(drag, &[], CANVAS, &SnapOptions::default());
        assert!((result.position.x - 612.0).abs() < f64::EPSILON);
        assert!(result.lines.iter().any(|l| l.id == "canvas-v-centerX"));
    }

    #[test]
    fn test_guide_lines_span_both_rects() {
        let targets = [SnapTarget::new("b", Rect::new(100.0, 50.0, 150.0, 90.0))];
        let drag = Rect::new(102.0, 300.0, 132.0, 320.0);
        let result = snap_rect(drag, &targets, CANVAS, &SnapOptions::default());
        let line = result.lines.iter().find(|l| l.id == "v-b-left").unwrap();
        assert_eq!(line.orientation, GuideOrientation::Vertical);
        assert!((line.start.x - 100.0).abs() < f64::EPSILON);
        assert!((line.start.y - 30.0).abs() < f64::EPSILON);
        assert!((line.end.y - 340.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_targets_far_from_canvas_edges() {
        let drag = Rect::new(300.0, 300.0, 350.0, 350.0);
        let result = snap_rect(drag, &[], CANVAS, &SnapOptions::default());
        assert_eq!(result, SnapResult::none(Point::new(300.0, 300.0)));
    }
}
