//! A page: canvas settings plus the component tree.

use crate::node::Padding;
use crate::tree::ComponentTree;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_WIDTH: f64 = 1280.0;
pub const DEFAULT_PAGE_HEIGHT: f64 = 800.0;
pub const DEFAULT_BACKGROUND: &str = "#fff";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Page {
    pub id: String,
    pub name: String,
    pub description: String,
    pub width: f64,
    pub height: f64,
    pub padding: Padding,
    pub background_color: String,
    pub components: ComponentTree,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            id: format!("page_{}", Uuid::new_v4()),
            name: String::new(),
            description: String::new(),
            width: DEFAULT_PAGE_WIDTH,
            height: DEFAULT_PAGE_HEIGHT,
            padding: Padding::default(),
            background_color: DEFAULT_BACKGROUND.to_string(),
            components: ComponentTree::new(),
        }
    }
}

impl Page {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Copy of the page without renderer measurements.
    pub fn stripped(&self) -> Page {
        let roots = self
            .components
            .roots()
            .iter()
            .map(|root| root.strip_transient())
            .collect();
        Page {
            components: ComponentTree::from_nodes(roots),
            ..self.clone()
        }
    }

    /// Serialize to JSON. Transient measurement props are not written.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.stripped())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
