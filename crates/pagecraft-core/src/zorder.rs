//! Stacking order among siblings.
//!
//! Every operation looks only at the node's literal siblings (same parent, or
//! all top-level nodes) and returns the z-index changes it needs. The caller
//! applies them as one undoable step.

use crate::error::{EditError, EditResult};
use crate::tree::ComponentTree;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZOrderOp {
    BringToFront,
    BringForward,
    SendBackward,
    SendToBack,
}

impl ZOrderOp {
    pub fn label(self) -> &'static str {
        match self {
            ZOrderOp::BringToFront => "bring to front",
            ZOrderOp::BringForward => "bring forward",
            ZOrderOp::SendBackward => "send backward",
            ZOrderOp::SendToBack => "send to back",
        }
    }
}

/// One node's z-index before and after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZChange {
    pub id: String,
    pub before: i64,
    pub after: i64,
}

/// Compute the z-index changes for `op` on `id`. An empty list means the
/// node is already where the operation would put it.
pub fn plan(tree: &ComponentTree, id: &str, op: ZOrderOp) -> EditResult<Vec<ZChange>> {
    let node = tree.find_node(id).ok_or_else(|| EditError::NotFound(id.to_string()))?;
    let siblings = tree.siblings(&node.id).ok_or_else(|| EditError::NotFound(id.to_string()))?;
    let current = node.z_index();
    let others: Vec<(&str, i64)> = siblings
        .iter()
        .filter(|s| s.id != node.id)
        .map(|s| (s.id.as_str(), s.z_index()))
        .collect();

    let single = |after: i64| {
        if after == current {
            Vec::new()
        } else {
            vec![ZChange {
                id: node.id.clone(),
                before: current,
                after,
            }]
        }
    };

    let changes = match op {
        ZOrderOp::BringToFront => {
            let max = others.iter().map(|(_, z)| *z).fold(current, i64::max);
            single(max + 1)
        }
        ZOrderOp::BringForward => match others.iter().map(|(_, z)| *z).filter(|z| *z > current).min() {
            Some(above) => single(above + 1),
            None => Vec::new(),
        },
        ZOrderOp::SendBackward => match others.iter().map(|(_, z)| *z).filter(|z| *z < current).max() {
            Some(below) => single((below - 1).max(1)),
            None => Vec::new(),
        },
        ZOrderOp::SendToBack => {
            // Node at 1, the rest renumbered 2..=n in their current order.
            let mut rest = others.clone();
            rest.sort_by_key(|(_, z)| *z);
            let mut changes = single(1);
            changes.extend(
                rest.iter()
                    .zip(2..)
                    .filter(|((_, z), after)| z != after)
                    .map(|((sid, z), after)| ZChange {
                        id: sid.to_string(),
                        before: *z,
                        after,
                    }),
            );
            changes
        }
    };
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ComponentNode, prop};

    fn siblings(zs: &[i64]) -> ComponentTree {
        ComponentTree::from_nodes(
            zs.iter()
                .enumerate()
                .map(|(i, z)| ComponentNode::new(format!("n{i}"), "text").with_prop(prop::Z_INDEX, *z))
                .collect(),
        )
    }

    fn after_of(changes: &[ZChange], id: &str) -> Option<i64> {
        changes.iter().find(|c| c.id == id).map(|c| c.after)
    }

    #[test]
    fn test_bring_to_front() {
        let tree = siblings(&[1, 2, 3]);
        let changes = plan(&tree, "n0", ZOrderOp::BringToFront).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(after_of(&changes, "n0"), Some(4));
        let changes = plan(&tree, "n2", ZOrderOp::BringToFront).unwrap();
        assert_eq!(after_of(&changes, "n2"), Some(4));
    }

    #[test]
    fn test_bring_forward_jumps_next_above() {
        let tree = siblings(&[1, 5, 3]);
        let changes = plan(&tree, "n0", ZOrderOp::BringForward).unwrap();
        assert_eq!(after_of(&changes, "n0"), Some(4));
        assert!(plan(&tree, "n1", ZOrderOp::BringForward).unwrap().is_empty());
    }

    #[test]
    fn test_send_backward_floors_at_one() {
        let tree = siblings(&[1, 5, 3]);
        let changes = plan(&tree, "n1", ZOrderOp::SendBackward).unwrap();
        assert_eq!(after_of(&changes, "n1"), Some(2));
        let changes = plan(&tree, "n2", ZOrderOp::SendBackward).unwrap();
        assert_eq!(after_of(&changes, "n2"), Some(1));
        assert!(plan(&tree, "n0", ZOrderOp::SendBackward).unwrap().is_empty());
    }

    #[test]
    fn test_send_to_back_keeps_order_dense() {
        let tree = siblings(&[1, 2, 3]);
        let changes = plan(&tree, "n2", ZOrderOp::SendToBack).unwrap();
        assert_eq!(after_of(&changes, "n2"), Some(1));
        assert_eq!(after_of(&changes, "n0"), Some(2));
        assert_eq!(after_of(&changes, "n1"), Some(3));
    }

    #[test]
    fn test_send_middle_to_back_stays_contiguous() {
        let tree = siblings(&[1, 2, 3]);
        let changes = plan(&tree, "n1", ZOrderOp::SendToBack).unwrap();
        assert_eq!(after_of(&changes, "n1"), Some(1));
        assert_eq!(after_of(&changes, "n0"), Some(2));
        assert_eq!(after_of(&changes, "n2"), None);
    }

    #[test]
    fn test_send_to_back_closes_gaps() {
        let tree = siblings(&[4, 9, 7]);
        let changes = plan(&tree, "n1", ZOrderOp::SendToBack).unwrap();
        assert_eq!(after_of(&changes, "n1"), Some(1));
        assert_eq!(after_of(&changes, "n0"), Some(2));
        assert_eq!(after_of(&changes, "n2"), Some(3));
        assert!(plan(&siblings(&[1, 2, 3]), "n0", ZOrderOp::SendToBack).unwrap().is_empty());
    }

    #[test]
    fn test_scoped_to_literal_siblings() {
        let tree = ComponentTree::from_nodes(vec![
            ComponentNode::container("box")
                .with_prop(prop::Z_INDEX, 1)
                .with_child(ComponentNode::new("inner", "text").with_prop(prop::Z_INDEX, 1)),
            ComponentNode::new("top", "text").with_prop(prop::Z_INDEX, 9),
        ]);
        let changes = plan(&tree, "inner", ZOrderOp::BringToFront).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(after_of(&changes, "inner"), Some(2));
        assert_eq!(
            plan(&tree, "missing", ZOrderOp::BringToFront),
            Err(EditError::NotFound("missing".into()))
        );
    }
}
