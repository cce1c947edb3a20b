//! Component nodes and typed access to their props bag.

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Type tag of the built-in container.
pub const CONTAINER_KIND: &str = "container";

/// Size used when a node carries neither a stored nor a measured size.
pub const FALLBACK_SIZE: f64 = 100.0;

/// Open props bag.
pub type Props = Map<String, Value>;

/// Well-known prop keys.
pub mod prop {
    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const Z_INDEX: &str = "zIndex";
    pub const WIDTH_SIZING: &str = "widthSizing";
    pub const HEIGHT_SIZING: &str = "heightSizing";
    pub const LAYOUT_MODE: &str = "layoutMode";
    pub const PADDING: &str = "padding";
    pub const BORDER_WIDTH: &str = "borderWidth";
    pub const RENDER_VISIBLE: &str = "renderVisible";
    pub const LOOP_ENABLED: &str = "loopEnabled";
    /// Text-style auto width, set to `"auto"`.
    pub const WIDTH_MODE: &str = "widthMode";
    pub const AUTO_HEIGHT: &str = "autoHeight";
    /// Template node a reusable-component instance node was created from.
    pub const SOURCE_ID: &str = "ccSourceId";

    pub const MEASURED_WIDTH: &str = "_measuredWidth";
    pub const MEASURED_HEIGHT: &str = "_measuredHeight";
    pub const MEASURED_CANVAS_X: &str = "_measuredCanvasX";
    pub const MEASURED_CANVAS_Y: &str = "_measuredCanvasY";

    /// Props written by measurement. Never persisted.
    pub const TRANSIENT: [&str; 4] = [
        MEASURED_WIDTH,
        MEASURED_HEIGHT,
        MEASURED_CANVAS_X,
        MEASURED_CANVAS_Y,
    ];
}

/// How a container positions its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Children carry explicit `x,y` relative to the padded content box.
    #[default]
    #[serde(alias = "absolute")]
    Manual,
    /// Children are placed by an external layout algorithm.
    #[serde(alias = "flex", alias = "default")]
    Flow,
}

impl LayoutMode {
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            None | Some("manual") | Some("absolute") => LayoutMode::Manual,
            Some(_) => LayoutMode::Flow,
        }
    }
}

/// Sizing mode of one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sizing {
    #[default]
    Fixed,
    /// Stretches to the parent; not user-resizable or draggable on this axis.
    Fill,
    /// Sized by content.
    #[serde(alias = "hug", alias = "content")]
    Auto,
}

impl Sizing {
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("fill") => Sizing::Fill,
            Some("auto") | Some("hug") | Some("content") => Sizing::Auto,
            _ => Sizing::Fixed,
        }
    }
}

/// Container padding. Accepts either a single number or a per-side object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
}

impl Padding {
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => Self::uniform(n.as_f64().unwrap_or(0.0)),
            Some(Value::Object(map)) => {
                let side = |key: &str| map.get(key).and_then(Value::as_f64).unwrap_or(0.0);
                Self {
                    top: side("top"),
                    right: side("right"),
                    bottom: side("bottom"),
                    left: side("left"),
                }
            }
            _ => Self::default(),
        }
    }

    pub fn to_value(self) -> Value {
        serde_json::json!({
            "top": self.top,
            "right": self.right,
            "bottom": self.bottom,
            "left": self.left,
        })
    }
}

/// Link from an instance root to the reusable-component definition it came
/// from, with the instance's own prop and state values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMeta {
    pub def_id: String,
    #[serde(default)]
    pub props: Props,
    #[serde(default)]
    pub state: Props,
}

/// A node of the component tree.
///
/// Children are shared pointers so that rebuilding one path of the tree
/// leaves every other subtree pointer-equal to its previous version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub props: Props,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub events: Value,
    #[serde(default)]
    pub children: Vec<Arc<ComponentNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_container: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomMeta>,
}

impl ComponentNode {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            name: String::new(),
            props: Props::new(),
            bindings: BTreeMap::new(),
            events: Value::Null,
            children: Vec::new(),
            is_container: None,
            custom: None,
        }
    }

    /// A container with manual layout.
    pub fn container(id: impl Into<String>) -> Self {
        Self::new(id, CONTAINER_KIND)
    }

    /// Builder-style prop setter.
    pub fn with_prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn with_rect(self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.with_prop(prop::X, x)
            .with_prop(prop::Y, y)
            .with_prop(prop::WIDTH, width)
            .with_prop(prop::HEIGHT, height)
    }

    pub fn with_child(mut self, child: ComponentNode) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    pub fn is_container(&self) -> bool {
        self.is_container.unwrap_or(self.kind == CONTAINER_KIND)
    }

    pub fn set_prop(&mut self, key: &str, value: impl Into<Value>) {
        self.props.insert(key.to_string(), value.into());
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.props.get(key).and_then(Value::as_f64)
    }

    pub fn x(&self) -> f64 {
        self.number(prop::X).unwrap_or(0.0)
    }

    pub fn y(&self) -> f64 {
        self.number(prop::Y).unwrap_or(0.0)
    }

    pub fn position(&self) -> Point {
        Point::new(self.x(), self.y())
    }

    /// Stored width, if any.
    pub fn width(&self) -> Option<f64> {
        self.number(prop::WIDTH)
    }

    pub fn height(&self) -> Option<f64> {
        self.number(prop::HEIGHT)
    }

    /// Stacking order among siblings. Missing or zero reads as 1.
    pub fn z_index(&self) -> i64 {
        match self.props.get(prop::Z_INDEX) {
            Some(Value::Number(n)) => {
                let z = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(1);
                if z == 0 { 1 } else { z }
            }
            _ => 1,
        }
    }

    pub fn width_sizing(&self) -> Sizing {
        Sizing::from_value(self.props.get(prop::WIDTH_SIZING))
    }

    pub fn height_sizing(&self) -> Sizing {
        Sizing::from_value(self.props.get(prop::HEIGHT_SIZING))
    }

    pub fn layout_mode(&self) -> LayoutMode {
        LayoutMode::from_value(self.props.get(prop::LAYOUT_MODE))
    }

    pub fn padding(&self) -> Padding {
        Padding::from_value(self.props.get(prop::PADDING))
    }

    /// Whether the width follows the content (text auto width).
    pub fn auto_width(&self) -> bool {
        self.width_sizing() == Sizing::Auto
            || self.props.get(prop::WIDTH_MODE).and_then(Value::as_str) == Some("auto")
    }

    pub fn auto_height(&self) -> bool {
        self.height_sizing() == Sizing::Auto
            || self.props.get(prop::AUTO_HEIGHT).and_then(Value::as_bool) == Some(true)
    }

    /// Size reported by the renderer, if both axes were measured.
    pub fn measured_size(&self) -> Option<Size> {
        Some(Size::new(
            self.number(prop::MEASURED_WIDTH)?,
            self.number(prop::MEASURED_HEIGHT)?,
        ))
    }

    /// Content-space position reported by the renderer.
    pub fn measured_origin(&self) -> Option<Point> {
        Some(Point::new(
            self.number(prop::MEASURED_CANVAS_X)?,
            self.number(prop::MEASURED_CANVAS_Y)?,
        ))
    }

    /// Effective size: measured size on non-fixed axes, otherwise the stored
    /// size, falling back to measured and then [`FALLBACK_SIZE`].
    pub fn effective_size(&self) -> Size {
        let measured = self.measured_size();
        let axis = |sizing: Sizing, stored: Option<f64>, measured: Option<f64>| {
            if sizing != Sizing::Fixed {
                if let Some(m) = measured {
                    return m;
                }
            }
            stored.or(measured).unwrap_or(FALLBACK_SIZE)
        };
        Size::new(
            axis(self.width_sizing(), self.width(), measured.map(|s| s.width)),
            axis(self.height_sizing(), self.height(), measured.map(|s| s.height)),
        )
    }

    /// Find a node in this subtree, including `self`.
    pub fn find(&self, id: &str) -> Option<&ComponentNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Whether `id` names a strict descendant of this node.
    pub fn has_descendant(&self, id: &str) -> bool {
        self.children.iter().any(|child| child.find(id).is_some())
    }

    /// Visit every node of this subtree depth-first, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ComponentNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Ids of this node and all descendants.
    pub fn subtree_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.walk(&mut |node| ids.push(node.id.clone()));
        ids
    }

    /// Drop transient props from this subtree.
    pub fn strip_transient(&self) -> ComponentNode {
        let mut node = self.clone();
        for key in prop::TRANSIENT {
            node.props.remove(key);
        }
        node.children = self
            .children
            .iter()
            .map(|child| Arc::new(child.strip_transient()))
            .collect();
        node
    }
}
