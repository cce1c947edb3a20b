//! The component tree store.
//!
//! The tree is persistent: every mutation rebuilds only the nodes on the path
//! from the edited node up to the root and reuses every other subtree. Holders
//! of an older [`ComponentTree`] keep a valid snapshot and can detect change
//! with [`ComponentTree::ptr_eq`].
//!
//! Every operation accepts loop-instance ids and resolves them to the source
//! node first.

use crate::error::{EditError, EditResult};
use crate::loop_instance;
use crate::node::{ComponentNode, LayoutMode, Props, prop};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Partial prop update. `None` removes the key.
pub type PropPatch = BTreeMap<String, Option<Value>>;

/// Record the current values of `keys` so they can be restored later.
pub fn capture_patch<'a>(props: &Props, keys: impl IntoIterator<Item = &'a str>) -> PropPatch {
    keys.into_iter()
        .map(|key| (key.to_string(), props.get(key).cloned()))
        .collect()
}

/// Turn a plain props bag into a patch that sets every key.
pub fn patch_from_props(props: &Props) -> PropPatch {
    props
        .iter()
        .map(|(k, v)| (k.clone(), Some(v.clone())))
        .collect()
}

/// Where a node lives: at the top level of the page or under a parent node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum ParentRef {
    TopLevel,
    Node(String),
}

impl ParentRef {
    pub fn from_option(id: Option<&str>) -> Self {
        match id {
            Some(id) => ParentRef::Node(id.to_string()),
            None => ParentRef::TopLevel,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            ParentRef::TopLevel => None,
            ParentRef::Node(id) => Some(id),
        }
    }
}

/// A subtree taken out of the tree by [`ComponentTree::delete_node`].
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    pub node: Arc<ComponentNode>,
    pub parent: ParentRef,
    pub index: usize,
}

/// A node together with its resolved content-space rectangle.
#[derive(Debug, Clone)]
pub struct PlacedNode {
    pub node: Arc<ComponentNode>,
    pub rect: Rect,
    /// z-index of every ancestor from the top level down, then the node's own.
    pub stack: Vec<i64>,
    /// Position in depth-first document order.
    pub order: usize,
}

/// The component hierarchy of one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentTree {
    roots: Arc<Vec<Arc<ComponentNode>>>,
    /// Refuse deleting top-level containers (definition editing).
    #[serde(skip)]
    protect_root: bool,
}

impl PartialEq for ComponentTree {
    fn eq(&self, other: &Self) -> bool {
        self.roots == other.roots
    }
}

impl ComponentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<ComponentNode>) -> Self {
        Self {
            roots: Arc::new(nodes.into_iter().map(Arc::new).collect()),
            protect_root: false,
        }
    }

    pub fn roots(&self) -> &[Arc<ComponentNode>] {
        &self.roots
    }

    /// True when both handles point at the same tree version.
    pub fn ptr_eq(&self, other: &ComponentTree) -> bool {
        Arc::ptr_eq(&self.roots, &other.roots)
    }

    pub fn set_protect_root(&mut self, protect: bool) {
        self.protect_root = protect;
    }

    pub fn protects_root(&self) -> bool {
        self.protect_root
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of nodes in the whole tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Visit every node depth-first, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a ComponentNode)) {
        for root in self.roots.iter() {
            root.walk(visit);
        }
    }

    pub fn find_node(&self, id: &str) -> Option<&Arc<ComponentNode>> {
        find_in(&self.roots, loop_instance::source_id(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    /// Ancestors of `id` from the top level down, and its index among its
    /// siblings.
    pub fn ancestors(&self, id: &str) -> Option<(Vec<&Arc<ComponentNode>>, usize)> {
        let mut path = Vec::new();
        let index = path_to(&self.roots, loop_instance::source_id(id), &mut path)?;
        Some((path, index))
    }

    /// Literal parent of `id` and its index in the parent's children.
    pub fn parent_of(&self, id: &str) -> Option<(ParentRef, usize)> {
        let (path, index) = self.ancestors(id)?;
        let parent = ParentRef::from_option(path.last().map(|p| p.id.as_str()));
        Some((parent, index))
    }

    /// Nearest ancestor container of `id`. `Some(TopLevel)` means the node
    /// exists but has no container above it; `None` means it does not exist.
    pub fn find_parent_container_id(&self, id: &str) -> Option<ParentRef> {
        let (path, _) = self.ancestors(id)?;
        Some(
            path.iter()
                .rev()
                .find(|node| node.is_container())
                .map(|node| ParentRef::Node(node.id.clone()))
                .unwrap_or(ParentRef::TopLevel),
        )
    }

    /// The children list under `parent`.
    pub fn children_of(&self, parent: &ParentRef) -> Option<&[Arc<ComponentNode>]> {
        match parent {
            ParentRef::TopLevel => Some(self.roots.as_slice()),
            ParentRef::Node(id) => self.find_node(id).map(|node| node.children.as_slice()),
        }
    }

    /// The node and its literal siblings.
    pub fn siblings(&self, id: &str) -> Option<&[Arc<ComponentNode>]> {
        let (parent, _) = self.parent_of(id)?;
        self.children_of(&parent)
    }

    /// Next z-index for a new top-level node: one above the current maximum,
    /// or 1 on an empty page.
    pub fn next_top_level_z(&self) -> i64 {
        self.roots
            .iter()
            .map(|node| node.z_index())
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Append `node` to the children of `container_id`.
    pub fn insert_child(&mut self, container_id: &str, node: ComponentNode) -> EditResult<()> {
        let parent = ParentRef::Node(loop_instance::source_id(container_id).to_string());
        self.insert_at(&parent, usize::MAX, Arc::new(node))
    }

    pub fn insert_top_level(&mut self, node: ComponentNode) -> EditResult<()> {
        self.insert_at(&ParentRef::TopLevel, usize::MAX, Arc::new(node))
    }

    /// Insert a subtree under `parent` at `index`, clamped to the valid range.
    pub fn insert_at(&mut self, parent: &ParentRef, index: usize, node: Arc<ComponentNode>) -> EditResult<()> {
        let parent = &match parent {
            ParentRef::Node(pid) => ParentRef::Node(loop_instance::source_id(pid).to_string()),
            ParentRef::TopLevel => ParentRef::TopLevel,
        };
        if let ParentRef::Node(pid) = parent {
            let container = self
                .find_node(pid)
                .ok_or_else(|| EditError::ContainerNotFound(pid.clone()))?;
            if !container.is_container() {
                return Err(EditError::NotAContainer(pid.clone()));
            }
        }
        let existing = self.id_set();
        if let Some(dup) = node.subtree_ids().into_iter().find(|id| existing.contains(id.as_str())) {
            return Err(EditError::DuplicateId(dup));
        }
        let roots = with_children(&self.roots, parent, &mut |children| {
            let at = index.min(children.len());
            children.insert(at, node.clone());
        })
        .ok_or_else(|| EditError::ContainerNotFound(parent.id().unwrap_or_default().to_string()))?;
        self.roots = Arc::new(roots);
        Ok(())
    }

    /// Reparent a subtree.
    ///
    /// `new_parent` of `None` moves the node to the top level. `index` is
    /// clamped; `None` appends. `local` replaces the node's `x,y` when the new
    /// parent positions children manually.
    pub fn move_node(
        &mut self,
        id: &str,
        new_parent: Option<&str>,
        index: Option<usize>,
        local: Option<Point>,
    ) -> EditResult<()> {
        let id = loop_instance::source_id(id);
        let node = self
            .find_node(id)
            .ok_or_else(|| EditError::NotFound(id.to_string()))?
            .clone();

        let (target, manual) = match new_parent.map(loop_instance::source_id) {
            Some(pid) => {
                if pid == id || node.has_descendant(pid) {
                    log::warn!("Refusing to move {} into its descendant {}", id, pid);
                    return Err(EditError::Cycle {
                        node: id.to_string(),
                        target: pid.to_string(),
                    });
                }
                let container = self
                    .find_node(pid)
                    .ok_or_else(|| EditError::ContainerNotFound(pid.to_string()))?;
                if !container.is_container() {
                    return Err(EditError::NotAContainer(pid.to_string()));
                }
                let manual = container.layout_mode() == LayoutMode::Manual;
                (ParentRef::Node(pid.to_string()), manual)
            }
            None => (ParentRef::TopLevel, true),
        };

        let (detached, removed) =
            detach_in(&self.roots, id, None).ok_or_else(|| EditError::NotFound(id.to_string()))?;

        let moved = match local {
            Some(p) if manual => {
                let mut node = (*removed.node).clone();
                node.set_prop(prop::X, p.x);
                node.set_prop(prop::Y, p.y);
                Arc::new(node)
            }
            _ => removed.node,
        };

        let index = index.unwrap_or(usize::MAX);
        let roots = with_children(&detached, &target, &mut |children| {
            let at = index.min(children.len());
            children.insert(at, moved.clone());
        })
        .ok_or_else(|| EditError::ContainerNotFound(target.id().unwrap_or_default().to_string()))?;
        self.roots = Arc::new(roots);
        Ok(())
    }

    /// Shallow-merge `props` into the node's props bag.
    pub fn patch_node(&mut self, id: &str, props: Props) -> EditResult<()> {
        self.update_node(id, |node| {
            let mut next = node.clone();
            next.props.extend(props.clone());
            next
        })
    }

    /// Apply a patch where `None` values remove keys.
    pub fn apply_patch(&mut self, id: &str, patch: &PropPatch) -> EditResult<()> {
        self.update_node(id, |node| {
            let mut next = node.clone();
            for (key, value) in patch {
                match value {
                    Some(value) => {
                        next.props.insert(key.clone(), value.clone());
                    }
                    None => {
                        next.props.remove(key);
                    }
                }
            }
            next
        })
    }

    /// Rebuild one node through `f`, sharing everything off its path.
    pub fn update_node(&mut self, id: &str, f: impl Fn(&ComponentNode) -> ComponentNode) -> EditResult<()> {
        let id = loop_instance::source_id(id);
        let roots = map_in(&self.roots, id, &mut |node| f(node))
            .ok_or_else(|| EditError::NotFound(id.to_string()))?;
        self.roots = Arc::new(roots);
        Ok(())
    }

    /// Remove a subtree. Top-level containers are protected while editing a
    /// reusable-component definition.
    pub fn delete_node(&mut self, id: &str) -> EditResult<Removed> {
        let id = loop_instance::source_id(id);
        if self.protect_root {
            if let Some(root) = self.roots.iter().find(|n| n.id == id) {
                if root.is_container() {
                    log::warn!("Refusing to delete editing root {}", id);
                    return Err(EditError::ProtectedRoot(id.to_string()));
                }
            }
        }
        let (roots, removed) =
            detach_in(&self.roots, id, None).ok_or_else(|| EditError::NotFound(id.to_string()))?;
        self.roots = Arc::new(roots);
        Ok(removed)
    }

    fn id_set(&self) -> HashSet<&str> {
        let mut ids = HashSet::new();
        self.walk(&mut |node| {
            ids.insert(node.id.as_str());
        });
        ids
    }

    /// Content-space rectangle of a node.
    ///
    /// Children of manual containers sit at their `x,y` inside the parent's
    /// padded content box. Children of flow containers use their measured
    /// position when one was reported, otherwise the content box origin.
    pub fn resolve_rect(&self, id: &str) -> Option<Rect> {
        let (path, index) = self.ancestors(id)?;
        let siblings = match path.last().copied() {
            Some(parent) => parent.children.as_slice(),
            None => self.roots.as_slice(),
        };
        let target = siblings.get(index)?;
        let mut origin = Point::ZERO;
        let mut layout = LayoutMode::Manual;
        let mut rect = Rect::ZERO;
        for node in path.into_iter().chain(std::iter::once(target)) {
            rect = place(node, origin, layout);
            origin = content_origin(node, rect);
            layout = node.layout_mode();
        }
        Some(rect)
    }

    /// Every node with its resolved rectangle, in document order.
    pub fn placed_nodes(&self) -> Vec<PlacedNode> {
        let mut out = Vec::new();
        place_all(&self.roots, Point::ZERO, LayoutMode::Manual, &[], &mut out);
        out
    }
}

fn place(node: &ComponentNode, parent_origin: Point, parent_layout: LayoutMode) -> Rect {
    let origin = match parent_layout {
        LayoutMode::Manual => parent_origin + node.position().to_vec2(),
        LayoutMode::Flow => node.measured_origin().unwrap_or(parent_origin),
    };
    Rect::from_origin_size(origin, node.effective_size())
}

/// Top-left of a node's padded content box.
pub fn content_origin(node: &ComponentNode, rect: Rect) -> Point {
    let padding = node.padding();
    rect.origin() + Vec2::new(padding.left, padding.top)
}

fn place_all(
    list: &[Arc<ComponentNode>],
    origin: Point,
    layout: LayoutMode,
    stack: &[i64],
    out: &mut Vec<PlacedNode>,
) {
    for node in list {
        let rect = place(node, origin, layout);
        let mut own = stack.to_vec();
        own.push(node.z_index());
        let order = out.len();
        out.push(PlacedNode {
            node: node.clone(),
            rect,
            stack: own.clone(),
            order,
        });
        place_all(&node.children, content_origin(node, rect), node.layout_mode(), &own, out);
    }
}

fn find_in<'a>(list: &'a [Arc<ComponentNode>], id: &str) -> Option<&'a Arc<ComponentNode>> {
    for node in list {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_in(&node.children, id) {
            return Some(found);
        }
    }
    None
}

fn path_to<'a>(list: &'a [Arc<ComponentNode>], id: &str, path: &mut Vec<&'a Arc<ComponentNode>>) -> Option<usize> {
    for (i, node) in list.iter().enumerate() {
        if node.id == id {
            return Some(i);
        }
        path.push(node);
        if let Some(index) = path_to(&node.children, id, path) {
            return Some(index);
        }
        path.pop();
    }
    None
}

/// Rebuild the path to `id`, replacing that node with `f(node)`.
fn map_in(
    list: &[Arc<ComponentNode>],
    id: &str,
    f: &mut dyn FnMut(&ComponentNode) -> ComponentNode,
) -> Option<Vec<Arc<ComponentNode>>> {
    for (i, node) in list.iter().enumerate() {
        let replacement = if node.id == id {
            Some(f(node))
        } else {
            map_in(&node.children, id, f).map(|children| {
                let mut parent = (**node).clone();
                parent.children = children;
                parent
            })
        };
        if let Some(replacement) = replacement {
            let mut out = list.to_vec();
            out[i] = Arc::new(replacement);
            return Some(out);
        }
    }
    None
}

fn with_children(
    list: &[Arc<ComponentNode>],
    parent: &ParentRef,
    edit: &mut dyn FnMut(&mut Vec<Arc<ComponentNode>>),
) -> Option<Vec<Arc<ComponentNode>>> {
    match parent {
        ParentRef::TopLevel => {
            let mut out = list.to_vec();
            edit(&mut out);
            Some(out)
        }
        ParentRef::Node(pid) => map_in(list, pid, &mut |node| {
            let mut next = node.clone();
            edit(&mut next.children);
            next
        }),
    }
}

fn detach_in(
    list: &[Arc<ComponentNode>],
    id: &str,
    parent: Option<&str>,
) -> Option<(Vec<Arc<ComponentNode>>, Removed)> {
    for (i, node) in list.iter().enumerate() {
        if node.id == id {
            let mut out = list.to_vec();
            let taken = out.remove(i);
            return Some((
                out,
                Removed {
                    node: taken,
                    parent: ParentRef::from_option(parent),
                    index: i,
                },
            ));
        }
        if let Some((children, removed)) = detach_in(&node.children, id, Some(&node.id)) {
            let mut rebuilt = (**node).clone();
            rebuilt.children = children;
            let mut out = list.to_vec();
            out[i] = Arc::new(rebuilt);
            return Some((out, removed));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// page: [panel(container){ title, inner(container){ leaf } }, footer]
    fn sample() -> ComponentTree {
        let inner = ComponentNode::container("inner")
            .with_rect(10.0, 10.0, 100.0, 80.0)
            .with_child(ComponentNode::new("leaf", "text").with_rect(5.0, 5.0, 20.0, 10.0));
        let panel = ComponentNode::container("panel")
            .with_rect(100.0, 50.0, 400.0, 300.0)
            .with_prop(prop::PADDING, 8)
            .with_child(ComponentNode::new("title", "text").with_rect(0.0, 0.0, 50.0, 20.0))
            .with_child(inner);
        let footer = ComponentNode::new("footer", "text").with_rect(0.0, 400.0, 300.0, 40.0);
        ComponentTree::from_nodes(vec![panel, footer])
    }

    #[test]
    fn test_find_node_strips_loop_suffix() {
        let tree = sample();
        assert_eq!(tree.find_node("leaf").map(|n| n.kind.as_str()), Some("text"));
        assert_eq!(tree.find_node("leaf__loop__2").map(|n| n.id.as_str()), Some("leaf"));
        assert!(tree.find_node("missing").is_none());
        assert_eq!(tree.node_count(), 5);
    }

    #[test]
    fn test_find_parent_container_id() {
        let tree = sample();
        assert_eq!(tree.find_parent_container_id("leaf"), Some(ParentRef::Node("inner".into())));
        assert_eq!(tree.find_parent_container_id("panel"), Some(ParentRef::TopLevel));
        assert_eq!(tree.find_parent_container_id("nope"), None);
    }

    #[test]
    fn test_insert_child_requires_container() {
        let mut tree = sample();
        let before = tree.clone();
        assert_eq!(
            tree.insert_child("missing", ComponentNode::new("x", "text")),
            Err(EditError::ContainerNotFound("missing".into()))
        );
        assert_eq!(
            tree.insert_child("footer", ComponentNode::new("x", "text")),
            Err(EditError::NotAContainer("footer".into()))
        );
        assert!(tree.ptr_eq(&before));
        tree.insert_child("inner", ComponentNode::new("x", "text")).unwrap();
        assert_eq!(tree.parent_of("x"), Some((ParentRef::Node("inner".into()), 1)));
    }

    #[test]
    fn test_duplicate_id_refused() {
        let mut tree = sample();
        assert_eq!(
            tree.insert_top_level(ComponentNode::new("leaf", "text")),
            Err(EditError::DuplicateId("leaf".into()))
        );
    }

    #[test]
    fn test_structural_sharing() {
        let mut tree = sample();
        let before = tree.clone();
        tree.patch_node("leaf", Props::from_iter([("x".to_string(), json!(42))]))
            .unwrap();
        assert!(!tree.ptr_eq(&before));
        // untouched top-level sibling
        assert!(Arc::ptr_eq(&before.roots()[1], &tree.roots()[1]));
        // untouched sibling inside the rebuilt path
        let old_title = before.find_node("title").unwrap();
        let new_title = tree.find_node("title").unwrap();
        assert!(Arc::ptr_eq(old_title, new_title));
        // path nodes rebuilt
        assert!(!Arc::ptr_eq(before.find_node("panel").unwrap(), tree.find_node("panel").unwrap()));
        assert!((tree.find_node("leaf").unwrap().x() - 42.0).abs() < f64::EPSILON);
        assert!((before.find_node("leaf").unwrap().x() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_patch_is_shallow_merge() {
        let mut tree = sample();
        tree.patch_node("footer", Props::from_iter([("color".to_string(), json!("red"))]))
            .unwrap();
        let footer = tree.find_node("footer").unwrap();
        assert_eq!(footer.props["color"], json!("red"));
        assert_eq!(footer.width(), Some(300.0));
    }

    #[test]
    fn test_apply_patch_removes_none() {
        let mut tree = sample();
        let patch = PropPatch::from([("width".to_string(), None), ("y".to_string(), Some(json!(1)))]);
        tree.apply_patch("footer", &patch).unwrap();
        let footer = tree.find_node("footer").unwrap();
        assert_eq!(footer.width(), None);
        assert!((footer.y() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_move_rejects_cycles() {
        let mut tree = sample();
        let before = tree.clone();
        let err = tree.move_node("panel", Some("inner"), None, None).unwrap_err();
        assert!(matches!(err, EditError::Cycle { .. }));
        assert!(tree.move_node("inner", Some("inner"), None, None).is_err());
        assert!(tree.ptr_eq(&before));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_move_into_manual_container_sets_local_position() {
        let mut tree = sample();
        tree.move_node("footer", Some("inner"), Some(0), Some(Point::new(3.0, 4.0)))
            .unwrap();
        assert_eq!(tree.parent_of("footer"), Some((ParentRef::Node("inner".into()), 0)));
        let footer = tree.find_node("footer").unwrap();
        assert!((footer.x() - 3.0).abs() < f64::EPSILON);
        assert!((footer.y() - 4.0).abs() < f64::EPSILON);
        assert_eq!(tree.roots().len(), 1);
    }

    #[test]
    fn test_move_into_flow_container_keeps_position() {
        let mut tree = sample();
        tree.patch_node("inner", Props::from_iter([(prop::LAYOUT_MODE.to_string(), json!("flow"))]))
            .unwrap();
        tree.move_node("footer", Some("inner"), None, Some(Point::new(3.0, 4.0)))
            .unwrap();
        assert!((tree.find_node("footer").unwrap().y() - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_move_clamps_index() {
        let mut tree = sample();
        tree.move_node("leaf", None, Some(99), None).unwrap();
        assert_eq!(tree.parent_of("leaf"), Some((ParentRef::TopLevel, 2)));
        tree.move_node("leaf", None, Some(0), None).unwrap();
        assert_eq!(tree.roots()[0].id, "leaf");
    }

    #[test]
    fn test_delete_node() {
        let mut tree = sample();
        let removed = tree.delete_node("inner").unwrap();
        assert_eq!(removed.parent, ParentRef::Node("panel".into()));
        assert_eq!(removed.index, 1);
        assert!(!tree.contains("leaf"));
        assert_eq!(tree.delete_node("inner"), Err(EditError::NotFound("inner".into())));
    }

    #[test]
    fn test_protected_root() {
        let mut tree = sample();
        tree.set_protect_root(true);
        assert_eq!(tree.delete_node("panel"), Err(EditError::ProtectedRoot("panel".into())));
        assert!(tree.delete_node("footer").is_ok());
        assert!(tree.delete_node("inner").is_ok());
        tree.set_protect_root(false);
        assert!(tree.delete_node("panel").is_ok());
    }

    #[test]
    fn test_resolve_rect_nested_manual() {
        let tree = sample();
        let leaf = tree.resolve_rect("leaf").unwrap();
        // panel (100,50) + padding 8 + inner (10,10) + leaf (5,5)
        assert!((leaf.x0 - 123.0).abs() < f64::EPSILON);
        assert!((leaf.y0 - 73.0).abs() < f64::EPSILON);
        assert!((leaf.width() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolve_rect_flow_uses_measurement() {
        let mut tree = sample();
        tree.patch_node(
            "panel",
            Props::from_iter([(prop::LAYOUT_MODE.to_string(), json!("flow"))]),
        )
        .unwrap();
        let title = tree.resolve_rect("title").unwrap();
        assert!((title.x0 - 108.0).abs() < f64::EPSILON);
        tree.patch_node(
            "title",
            Props::from_iter([
                (prop::MEASURED_CANVAS_X.to_string(), json!(130.0)),
                (prop::MEASURED_CANVAS_Y.to_string(), json!(70.0)),
            ]),
        )
        .unwrap();
        let title = tree.resolve_rect("title").unwrap();
        assert!((title.x0 - 130.0).abs() < f64::EPSILON);
        assert!((title.y0 - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_placed_nodes_order_and_stack() {
        let tree = sample();
        let placed = tree.placed_nodes();
        let ids: Vec<_> = placed.iter().map(|p| p.node.id.as_str()).collect();
        assert_eq!(ids, vec!["panel", "title", "inner", "leaf", "footer"]);
        assert_eq!(placed[3].stack.len(), 3);
    }

    #[test]
    fn test_next_top_level_z() {
        assert_eq!(ComponentTree::new().next_top_level_z(), 1);
        let mut tree = sample();
        tree.patch_node("footer", Props::from_iter([(prop::Z_INDEX.to_string(), json!(4))]))
            .unwrap();
        assert_eq!(tree.next_top_level_z(), 5);
    }
}
