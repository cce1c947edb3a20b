//! Selection state.

use crate::loop_instance;
use crate::node::ComponentNode;
use crate::tree::ComponentTree;
use std::sync::Arc;

/// How clicked ids are mapped to selectable nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectScope {
    /// Nodes inside a reusable-component instance select the instance root.
    #[default]
    Page,
    /// Editing a definition: every node is selectable on its own.
    Definition,
}

/// The selected nodes, in selection order.
///
/// Entries are node references taken from the current tree. After every tree
/// mutation [`Selection::refresh`] swaps them for the new versions and drops
/// the ones that no longer exist.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    nodes: Vec<Arc<ComponentNode>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Arc<ComponentNode>] {
        &self.nodes
    }

    pub fn ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        let id = loop_instance::source_id(id);
        self.nodes.iter().any(|n| n.id == id)
    }

    /// The single selected node, if exactly one is selected.
    pub fn single(&self) -> Option<&Arc<ComponentNode>> {
        match self.nodes.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Select `id`. In multi mode the node's membership is toggled; otherwise
    /// it replaces the selection. Returns false if nothing resolves.
    pub fn select(&mut self, tree: &ComponentTree, id: &str, multi: bool, scope: SelectScope) -> bool {
        let Some(node) = resolve_target(tree, id, scope) else {
            return false;
        };
        if multi {
            if let Some(pos) = self.nodes.iter().position(|n| n.id == node.id) {
                self.nodes.remove(pos);
            } else {
                self.nodes.push(node);
            }
        } else {
            self.nodes = vec![node];
        }
        true
    }

    /// Replace the selection with every resolvable id, without duplicates.
    pub fn select_many<'a>(&mut self, tree: &ComponentTree, ids: impl IntoIterator<Item = &'a str>, scope: SelectScope) {
        self.nodes.clear();
        for id in ids {
            if let Some(node) = resolve_target(tree, id, scope) {
                if !self.nodes.iter().any(|n| n.id == node.id) {
                    self.nodes.push(node);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Re-resolve every entry against `tree`, dropping stale ones.
    pub fn refresh(&mut self, tree: &ComponentTree) {
        self.nodes = self
            .nodes
            .iter()
            .filter_map(|n| tree.find_node(&n.id).cloned())
            .collect();
    }
}

/// The node a click on `id` selects.
///
/// Loop instances resolve to their source node. In page scope a node inside
/// a reusable-component instance resolves to the outermost instance root.
pub fn resolve_target(tree: &ComponentTree, id: &str, scope: SelectScope) -> Option<Arc<ComponentNode>> {
    let id = loop_instance::source_id(id);
    let (path, _) = tree.ancestors(id)?;
    if scope == SelectScope::Page {
        if let Some(root) = path.iter().find(|n| n.custom.is_some()) {
            return Some(Arc::clone(root));
        }
    }
    tree.find_node(id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CustomMeta;

    fn tree() -> ComponentTree {
        let mut card = ComponentNode::container("card")
            .with_child(ComponentNode::new("card_title", "text"));
        card.custom = Some(CustomMeta {
            def_id: "def_1".into(),
            ..Default::default()
        });
        ComponentTree::from_nodes(vec![
            ComponentNode::new("a", "text"),
            ComponentNode::new("b", "text"),
            card,
        ])
    }

    #[test]
    fn test_single_select_replaces() {
        let tree = tree();
        let mut selection = Selection::new();
        assert!(selection.select(&tree, "a", false, SelectScope::Page));
        assert!(selection.select(&tree, "b", false, SelectScope::Page));
        assert_eq!(selection.ids(), vec!["b"]);
        assert!(!selection.select(&tree, "zzz", false, SelectScope::Page));
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_multi_select_toggles() {
        let tree = tree();
        let mut selection = Selection::new();
        selection.select(&tree, "a", true, SelectScope::Page);
        selection.select(&tree, "b", true, SelectScope::Page);
        assert_eq!(selection.ids(), vec!["a", "b"]);
        selection.select(&tree, "a", true, SelectScope::Page);
        assert_eq!(selection.ids(), vec!["b"]);
    }

    #[test]
    fn test_loop_instance_redirects_to_source() {
        let tree = tree();
        let mut selection = Selection::new();
        selection.select(&tree, "a__loop__3", false, SelectScope::Page);
        assert_eq!(selection.ids(), vec!["a"]);
        assert!(selection.contains("a__loop__1"));
    }

    #[test]
    fn test_instance_descendant_redirects_in_page_scope() {
        let tree = tree();
        let mut selection = Selection::new();
        selection.select(&tree, "card_title", false, SelectScope::Page);
        assert_eq!(selection.ids(), vec!["card"]);
        selection.select(&tree, "card_title", false, SelectScope::Definition);
        assert_eq!(selection.ids(), vec!["card_title"]);
    }

    #[test]
    fn test_refresh_prunes_and_updates() {
        let mut tree = tree();
        let mut selection = Selection::new();
        selection.select_many(&tree, ["a", "b"], SelectScope::Page);
        tree.delete_node("a").unwrap();
        tree.patch_node("b", crate::node::Props::from_iter([("x".to_string(), serde_json::json!(9))]))
            .unwrap();
        selection.refresh(&tree);
        assert_eq!(selection.ids(), vec!["b"]);
        let b = selection.single().unwrap();
        assert!(Arc::ptr_eq(b, tree.find_node("b").unwrap()));
    }
}
