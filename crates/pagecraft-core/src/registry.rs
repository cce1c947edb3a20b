//! Boundary to the component-type catalog.
//!
//! The engine does not know what a "button" or a "select" is. When it needs
//! defaults, container capability or the resize behaviour of a type, it asks
//! a [`ComponentRegistry`].

use crate::node::{CONTAINER_KIND, ComponentNode, Padding, Props, prop};
use crate::resize::ResizeProfile;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

/// Source of per-type defaults.
pub trait ComponentRegistry {
    /// Props a freshly created node of `kind` starts with.
    fn default_props(&self, kind: &str) -> Props;

    /// Whether nodes of `kind` accept children.
    fn is_container(&self, kind: &str) -> bool {
        kind == CONTAINER_KIND
    }

    /// Which resize handles nodes of `kind` expose.
    fn resize_profile(&self, kind: &str) -> ResizeProfile {
        let _ = kind;
        ResizeProfile::Free
    }
}

/// Fresh node id of the form `<kind>_<uuid>`.
pub fn new_node_id(kind: &str) -> String {
    let kind = if kind.is_empty() { "comp" } else { kind };
    format!("{kind}_{}", Uuid::new_v4())
}

/// Create a node of `kind` with registry defaults and a fresh id.
pub fn create_node(registry: &dyn ComponentRegistry, kind: &str) -> ComponentNode {
    let mut node = ComponentNode::new(new_node_id(kind), kind);
    node.props = registry.default_props(kind);
    if registry.is_container(kind) {
        node.is_container = Some(true);
    }
    node
}

/// Props every node starts with.
pub fn base_props() -> Props {
    let mut props = Props::new();
    props.insert(prop::X.into(), json!(0));
    props.insert(prop::Y.into(), json!(0));
    props.insert(prop::WIDTH.into(), json!(200));
    props.insert(prop::HEIGHT.into(), json!(100));
    props.insert(prop::WIDTH_SIZING.into(), json!("fixed"));
    props.insert(prop::HEIGHT_SIZING.into(), json!("fixed"));
    props.insert(prop::BORDER_WIDTH.into(), json!(0));
    props.insert(prop::Z_INDEX.into(), json!(1));
    props.insert(prop::RENDER_VISIBLE.into(), json!(true));
    props.insert(prop::LOOP_ENABLED.into(), json!(false));
    props
}

/// A small in-process registry: base props, container defaults and
/// caller-supplied per-type overrides.
#[derive(Debug, Clone, Default)]
pub struct BasicRegistry {
    overrides: HashMap<String, Props>,
    profiles: HashMap<String, ResizeProfile>,
    containers: Vec<String>,
}

impl BasicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register props layered over the base props for `kind`.
    pub fn register(&mut self, kind: &str, props: Props) -> &mut Self {
        self.overrides.insert(kind.to_string(), props);
        self
    }

    pub fn register_container(&mut self, kind: &str) -> &mut Self {
        self.containers.push(kind.to_string());
        self
    }

    pub fn set_resize_profile(&mut self, kind: &str, profile: ResizeProfile) -> &mut Self {
        self.profiles.insert(kind.to_string(), profile);
        self
    }

    fn container_props() -> Props {
        let mut props = Props::new();
        props.insert(prop::WIDTH.into(), json!(200));
        props.insert(prop::HEIGHT.into(), json!(200));
        props.insert(prop::LAYOUT_MODE.into(), json!("manual"));
        props.insert(prop::PADDING.into(), Padding::uniform(8.0).to_value());
        props.insert(prop::BORDER_WIDTH.into(), json!(1));
        props
    }
}

impl ComponentRegistry for BasicRegistry {
    fn default_props(&self, kind: &str) -> Props {
        let mut props = base_props();
        if self.is_container(kind) {
            props.extend(Self::container_props());
        }
        if let Some(extra) = self.overrides.get(kind) {
            props.extend(extra.clone());
        }
        props
    }

    fn is_container(&self, kind: &str) -> bool {
        kind == CONTAINER_KIND || self.containers.iter().any(|c| c == kind)
    }

    fn resize_profile(&self, kind: &str) -> ResizeProfile {
        self.profiles.get(kind).copied().unwrap_or(ResizeProfile::Free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_node_uses_defaults() {
        let registry = BasicRegistry::new();
        let node = create_node(&registry, "button");
        assert!(node.id.starts_with("button_"));
        assert_eq!(node.width(), Some(200.0));
        assert_eq!(node.z_index(), 1);
        assert!(!node.is_container());
    }

    #[test]
    fn test_container_defaults() {
        let registry = BasicRegistry::new();
        let node = create_node(&registry, CONTAINER_KIND);
        assert!(node.is_container());
        assert_eq!(node.height(), Some(200.0));
        assert_eq!(node.padding(), Padding::uniform(8.0));
    }

    #[test]
    fn test_overrides_and_profiles() {
        let mut registry = BasicRegistry::new();
        let mut input = Props::new();
        input.insert(prop::HEIGHT.into(), json!(34));
        registry
            .register("input", input)
            .set_resize_profile("input", ResizeProfile::Horizontal)
            .register_container("card");
        assert_eq!(create_node(&registry, "input").height(), Some(34.0));
        assert_eq!(registry.resize_profile("input"), ResizeProfile::Horizontal);
        assert_eq!(registry.resize_profile("button"), ResizeProfile::Free);
        assert!(create_node(&registry, "card").is_container());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(new_node_id("text"), new_node_id("text"));
        assert!(new_node_id("").starts_with("comp_"));
    }
}
