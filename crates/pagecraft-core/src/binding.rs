//! Binding reference strings and the resolver boundary.
//!
//! A binding maps a prop name to a reference string. The engine only parses
//! and rewrites these strings; values always come from an external resolver.

use crate::node::{ComponentNode, Props};
use serde_json::Value;
use std::fmt;

const VAR_PREFIX: &str = "var:";
const COMP_PREFIX: &str = "comp:";
const CTX_PREFIX: &str = "ctx:";

/// A parsed binding reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingRef {
    /// A page variable. Bare names without a prefix are variables too.
    Var(String),
    /// Another component's prop: `comp:<id>:<propKey>`.
    Comp { component_id: String, prop_key: String },
    /// A dotted path into the execution context: `ctx:<path>`.
    Ctx(String),
    /// Empty reference.
    Raw,
}

impl BindingRef {
    pub fn parse(reference: &str) -> Self {
        if reference.is_empty() {
            return BindingRef::Raw;
        }
        if let Some(name) = reference.strip_prefix(VAR_PREFIX) {
            return BindingRef::Var(name.to_string());
        }
        if let Some(rest) = reference.strip_prefix(COMP_PREFIX) {
            let (component_id, prop_key) = rest.split_once(':').unwrap_or((rest, ""));
            return BindingRef::Comp {
                component_id: component_id.to_string(),
                prop_key: prop_key.to_string(),
            };
        }
        if let Some(path) = reference.strip_prefix(CTX_PREFIX) {
            return BindingRef::Ctx(path.to_string());
        }
        BindingRef::Var(reference.to_string())
    }

    /// Human-readable label, e.g. `title`, `Card.width`, `context.item.name`.
    ///
    /// `label_of` maps component ids to display names.
    pub fn display_label(&self, label_of: impl Fn(&str) -> String) -> String {
        match self {
            BindingRef::Var(name) => name.clone(),
            BindingRef::Comp {
                component_id,
                prop_key,
            } => {
                let label = label_of(component_id);
                if prop_key.is_empty() {
                    label
                } else {
                    format!("{label}.{prop_key}")
                }
            }
            BindingRef::Ctx(path) if path.is_empty() => "context".to_string(),
            BindingRef::Ctx(path) => format!("context.{path}"),
            BindingRef::Raw => String::new(),
        }
    }

    /// Same reference pointing at a different component.
    pub fn retarget(&self, component_id: &str) -> Option<BindingRef> {
        match self {
            BindingRef::Comp { prop_key, .. } => Some(BindingRef::Comp {
                component_id: component_id.to_string(),
                prop_key: prop_key.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for BindingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingRef::Var(name) => write!(f, "{VAR_PREFIX}{name}"),
            BindingRef::Comp {
                component_id,
                prop_key,
            } => write!(f, "{COMP_PREFIX}{component_id}:{prop_key}"),
            BindingRef::Ctx(path) => write!(f, "{CTX_PREFIX}{path}"),
            BindingRef::Raw => Ok(()),
        }
    }
}

/// Supplies values for binding references.
pub trait BindingResolver {
    fn resolve(&self, reference: &BindingRef) -> Option<Value>;
}

impl<F> BindingResolver for F
where
    F: Fn(&BindingRef) -> Option<Value>,
{
    fn resolve(&self, reference: &BindingRef) -> Option<Value> {
        self(reference)
    }
}

/// Look up a dotted path (`a.b.0.c`) in a JSON value.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    path.split('.')
        .filter(|part| !part.is_empty())
        .try_fold(root, |current, part| match current {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Props of `node` with every resolvable binding applied on top.
///
/// Unresolved bindings leave the stored prop untouched. Incomplete `comp:`
/// references and empty `ctx:` paths never reach the resolver.
pub fn rendered_props(node: &ComponentNode, resolver: &impl BindingResolver) -> Props {
    let mut props = node.props.clone();
    for (key, reference) in &node.bindings {
        let parsed = BindingRef::parse(reference);
        let resolvable = match &parsed {
            BindingRef::Comp {
                component_id,
                prop_key,
            } => !component_id.is_empty() && !prop_key.is_empty(),
            BindingRef::Ctx(path) => !path.trim().is_empty(),
            BindingRef::Var(_) => true,
            BindingRef::Raw => false,
        };
        if !resolvable {
            continue;
        }
        if let Some(value) = resolver.resolve(&parsed) {
            props.insert(key.clone(), value);
        }
    }
    props
}
