//! Reusable-component definitions and their instances.
//!
//! A definition stores a template subtree. Dropping it on a page creates an
//! instance: a deep copy with fresh ids whose nodes remember the template
//! node they came from in the `ccSourceId` prop.

use crate::binding::BindingRef;
use crate::node::{CONTAINER_KIND, ComponentNode, CustomMeta, Props, prop};
use crate::registry::new_node_id;
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

/// Describes one prop or state entry of a definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropSchema {
    #[serde(default)]
    pub label: String,
    /// `number`, `boolean`, `json`, `text`, `select`, `color`...
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
}

impl PropSchema {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    /// The explicit default, or the zero value of the declared type.
    pub fn default_value(&self) -> Value {
        if let Some(value) = &self.default {
            return value.clone();
        }
        match self.kind.as_str() {
            "number" => json!(0),
            "boolean" => json!(false),
            "json" => Value::Null,
            _ => json!(""),
        }
    }
}

pub type Schema = BTreeMap<String, PropSchema>;

/// Initial values for every schema entry.
pub fn schema_defaults(schema: &Schema) -> Props {
    schema
        .iter()
        .map(|(key, entry)| (key.clone(), entry.default_value()))
        .collect()
}

/// A reusable component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinition {
    pub id: String,
    pub name: String,
    pub template: ComponentNode,
    #[serde(default)]
    pub props_schema: Schema,
    #[serde(default)]
    pub state_schema: Schema,
}

impl ComponentDefinition {
    pub fn new(name: impl Into<String>, template: ComponentNode) -> Self {
        Self {
            id: format!("cc_{}", Uuid::new_v4()),
            name: name.into(),
            template,
            props_schema: Schema::new(),
            state_schema: Schema::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Id assignment rules for instantiation.
///
/// Template ids in `fixed` always map to the given id. Otherwise an id
/// already used by `existing` for the same template node is reused, and only
/// then a fresh one is generated.
#[derive(Debug, Clone, Default)]
pub struct InstanceIds {
    pub fixed: HashMap<String, String>,
    pub existing: HashMap<String, String>,
}

impl InstanceIds {
    /// Reuse the ids of an instance created earlier from the same template.
    pub fn reuse(instance: &ComponentNode) -> Self {
        let mut existing = HashMap::new();
        instance.walk(&mut |node| {
            if let Some(source) = node.props.get(prop::SOURCE_ID).and_then(Value::as_str) {
                if !source.is_empty() {
                    existing.insert(source.to_string(), node.id.clone());
                }
            }
        });
        Self {
            fixed: HashMap::new(),
            existing,
        }
    }

    pub fn fix(mut self, source: impl Into<String>, id: impl Into<String>) -> Self {
        self.fixed.insert(source.into(), id.into());
        self
    }

    fn assign(&self, node: &ComponentNode) -> String {
        self.fixed
            .get(&node.id)
            .or_else(|| self.existing.get(&node.id))
            .cloned()
            .unwrap_or_else(|| new_node_id(&node.kind))
    }
}

/// Copy `template` with new ids, recording each template id in
/// `ccSourceId` and pointing internal `comp:` bindings at the new ids.
pub fn instantiate_template(template: &ComponentNode, ids: &InstanceIds) -> ComponentNode {
    let mut assigned = HashMap::new();
    template.walk(&mut |node| {
        assigned.insert(node.id.clone(), ids.assign(node));
    });
    rebuild(template, &assigned)
}

fn rebuild(node: &ComponentNode, assigned: &HashMap<String, String>) -> ComponentNode {
    let mut next = node.clone();
    if let Some(id) = assigned.get(&node.id) {
        next.id = id.clone();
    }
    next.props.insert(prop::SOURCE_ID.to_string(), json!(node.id));
    for reference in next.bindings.values_mut() {
        let parsed = BindingRef::parse(reference.as_str());
        if let BindingRef::Comp { component_id, .. } = &parsed {
            if let Some(rewritten) = assigned.get(component_id).and_then(|id| parsed.retarget(id)) {
                *reference = rewritten.to_string();
            }
        }
    }
    next.children = node
        .children
        .iter()
        .map(|child| Arc::new(rebuild(child, assigned)))
        .collect();
    next
}

/// A new instance of `definition` with schema defaults for its props and
/// state.
pub fn instantiate(definition: &ComponentDefinition) -> ComponentNode {
    let mut root = instantiate_template(&definition.template, &InstanceIds::default());
    root.custom = Some(CustomMeta {
        def_id: definition.id.clone(),
        props: schema_defaults(&definition.props_schema),
        state: schema_defaults(&definition.state_schema),
    });
    root
}

/// Rebuild `instance` from the current template of its definition.
///
/// Node ids are kept wherever the template node still exists. The root keeps
/// its placement, and instance props or state survive for keys the schemas
/// still declare.
pub fn sync_instance(definition: &ComponentDefinition, instance: &ComponentNode) -> ComponentNode {
    let ids = InstanceIds::reuse(instance).fix(definition.template.id.clone(), instance.id.clone());
    let mut root = instantiate_template(&definition.template, &ids);
    for key in [prop::X, prop::Y, prop::Z_INDEX] {
        if let Some(value) = instance.props.get(key) {
            root.props.insert(key.to_string(), value.clone());
        }
    }
    let previous = instance.custom.clone().unwrap_or_default();
    let keep = |schema: &Schema, old: &Props| -> Props {
        let mut values = schema_defaults(schema);
        for (key, value) in values.iter_mut() {
            if let Some(existing) = old.get(key) {
                *value = existing.clone();
            }
        }
        values
    };
    root.custom = Some(CustomMeta {
        def_id: definition.id.clone(),
        props: keep(&definition.props_schema, &previous.props),
        state: keep(&definition.state_schema, &previous.state),
    });
    root
}

/// Smallest rectangle containing every rectangle of `rects`.
pub fn union_rect(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().reduce(|acc, r| acc.union(r))
}

/// Wrap `nodes` (with their content-space rectangles) in a fresh manual
/// container placed at the union's origin. Children are re-positioned
/// relative to that origin. Returns the container and the union.
pub fn wrap_in_container(nodes: &[(Arc<ComponentNode>, Rect)], name: &str, min_size: f64) -> Option<(ComponentNode, Rect)> {
    let union = union_rect(nodes.iter().map(|(_, r)| *r))?;
    let mut container = ComponentNode::new(new_node_id(CONTAINER_KIND), CONTAINER_KIND);
    container.name = name.to_string();
    container.is_container = Some(true);
    container.props = Props::from_iter([
        (prop::X.to_string(), json!(union.x0)),
        (prop::Y.to_string(), json!(union.y0)),
        (prop::WIDTH.to_string(), json!(union.width().max(min_size))),
        (prop::HEIGHT.to_string(), json!(union.height().max(min_size))),
        (prop::WIDTH_SIZING.to_string(), json!("fixed")),
        (prop::HEIGHT_SIZING.to_string(), json!("fixed")),
        (prop::LAYOUT_MODE.to_string(), json!("manual")),
        (prop::PADDING.to_string(), json!(0)),
        (prop::BORDER_WIDTH.to_string(), json!(0)),
        (prop::Z_INDEX.to_string(), json!(1)),
    ]);
    container.children = nodes
        .iter()
        .map(|(node, rect)| {
            let mut child = (**node).clone();
            child.set_prop(prop::X, rect.x0 - union.x0);
            child.set_prop(prop::Y, rect.y0 - union.y0);
            Arc::new(child)
        })
        .collect();
    Some((container, union))
}

/// Template for a new definition built from selected nodes.
///
/// A single node is copied with its position reset to the origin. Several
/// nodes are wrapped in a manual container sized to their union.
pub fn template_from_selection(nodes: &[(Arc<ComponentNode>, Rect)], name: &str, min_size: f64) -> Option<ComponentNode> {
    match nodes {
        [] => None,
        [(node, _)] => {
            let mut root = (**node).clone();
            root.set_prop(prop::X, 0);
            root.set_prop(prop::Y, 0);
            Some(root)
        }
        _ => {
            let (mut root, _) = wrap_in_container(nodes, name, min_size)?;
            root.set_prop(prop::X, 0);
            root.set_prop(prop::Y, 0);
            Some(root)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> ComponentDefinition {
        let mut title = ComponentNode::new("t_title", "text");
        title.bindings.insert("content".into(), "comp:t_input:value".into());
        let mut label = ComponentNode::new("t_label", "text");
        label.bindings.insert("content".into(), "comp:t_input".into());
        label.bindings.insert("color".into(), "var:theme".into());
        let template = ComponentNode::container("t_root")
            .with_child(title)
            .with_child(label)
            .with_child(ComponentNode::new("t_input", "input"));
        let mut def = ComponentDefinition::new("Card", template);
        def.props_schema.insert("count".into(), PropSchema::new("number"));
        def.props_schema.insert("title".into(), PropSchema::new("text"));
        def.state_schema.insert("open".into(), PropSchema::new("boolean"));
        def.state_schema.insert("data".into(), PropSchema::new("json"));
        def.state_schema.insert(
            "mode".into(),
            PropSchema {
                default: Some(json!("compact")),
                ..PropSchema::new("select")
            },
        );
        def
    }

    #[test]
    fn test_instantiate_assigns_fresh_ids() {
        let def = definition();
        let root = instantiate(&def);
        assert_ne!(root.id, "t_root");
        assert!(root.id.starts_with("container_"));
        assert_eq!(root.props.get(prop::SOURCE_ID), Some(&json!("t_root")));
        let input = &root.children[2];
        assert!(input.id.starts_with("input_"));
        assert_eq!(input.props.get(prop::SOURCE_ID), Some(&json!("t_input")));

        let again = instantiate(&def);
        assert_ne!(again.id, root.id);
    }

    #[test]
    fn test_internal_bindings_follow_new_ids() {
        let root = instantiate(&definition());
        let input_id = root.children[2].id.clone();
        assert_eq!(root.children[0].bindings["content"], format!("comp:{input_id}:value"));
        assert_eq!(root.children[1].bindings["content"], format!("comp:{input_id}:"));
        assert_eq!(root.children[1].bindings["color"], "var:theme");
    }

    #[test]
    fn test_schema_defaults() {
        let root = instantiate(&definition());
        let custom = root.custom.unwrap();
        assert_eq!(custom.props["count"], json!(0));
        assert_eq!(custom.props["title"], json!(""));
        assert_eq!(custom.state["open"], json!(false));
        assert_eq!(custom.state["data"], Value::Null);
        assert_eq!(custom.state["mode"], json!("compact"));
    }

    #[test]
    fn test_sync_keeps_ids_and_values() {
        let def = definition();
        let mut instance = instantiate(&def);
        instance.set_prop(prop::X, 40);
        if let Some(custom) = instance.custom.as_mut() {
            custom.props.insert("count".into(), json!(7));
        }

        let mut next = def.clone();
        let mut template = next.template.clone();
        template.children.push(Arc::new(ComponentNode::new("t_extra", "text")));
        next.template = template;
        next.props_schema.remove("title");

        let synced = sync_instance(&next, &instance);
        assert_eq!(synced.id, instance.id);
        assert_eq!(synced.children[2].id, instance.children[2].id);
        assert_eq!(synced.children.len(), 4);
        assert!((synced.x() - 40.0).abs() < f64::EPSILON);
        let custom = synced.custom.unwrap();
        assert_eq!(custom.props["count"], json!(7));
        assert!(!custom.props.contains_key("title"));
    }

    #[test]
    fn test_template_from_selection() {
        let a = Arc::new(ComponentNode::new("a", "text").with_rect(120.0, 60.0, 30.0, 20.0));
        let b = Arc::new(ComponentNode::new("b", "text").with_rect(150.0, 100.0, 40.0, 20.0));

        let single = template_from_selection(&[(a.clone(), Rect::new(120.0, 60.0, 150.0, 80.0))], "One", 100.0).unwrap();
        assert_eq!(single.id, "a");
        assert!((single.x() - 0.0).abs() < f64::EPSILON);

        let group = template_from_selection(
            &[
                (a, Rect::new(120.0, 60.0, 150.0, 80.0)),
                (b, Rect::new(150.0, 100.0, 190.0, 120.0)),
            ],
            "Pair",
            100.0,
        )
        .unwrap();
        assert!(group.is_container());
        assert_eq!(group.width(), Some(100.0));
        assert_eq!(group.height(), Some(100.0));
        assert!((group.children[1].x() - 30.0).abs() < f64::EPSILON);
        assert!((group.children[1].y() - 40.0).abs() < f64::EPSILON);
        assert!(template_from_selection(&[], "None", 100.0).is_none());
    }
}
