//! Undo/redo command log.
//!
//! The caller records a command before applying the mutation it describes.
//! Undo applies the command's inverse to the tree; redo re-applies it.

use crate::error::EditResult;
use crate::node::{ComponentNode, prop};
use crate::tree::{ComponentTree, ParentRef, PropPatch};
use kurbo::Point;
use serde_json::json;
use std::sync::Arc;

/// Default undo depth.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Where a node sits: parent, sibling index and stored position.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub parent: ParentRef,
    pub index: usize,
    pub position: Point,
}

/// A reversible tree mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `node` was inserted under `parent` at `index`.
    Add {
        node: Arc<ComponentNode>,
        parent: ParentRef,
        index: usize,
    },
    /// Props of `id` changed from `before` to `after`.
    Update {
        id: String,
        before: PropPatch,
        after: PropPatch,
    },
    /// `node` was removed from `parent` at `index`.
    Delete {
        node: Arc<ComponentNode>,
        parent: ParentRef,
        index: usize,
    },
    /// `id` was reparented.
    Move {
        id: String,
        from: Placement,
        to: Placement,
    },
    /// Several commands recorded as one step.
    Batch { label: String, commands: Vec<Command> },
}

impl Command {
    pub fn label(&self) -> String {
        match self {
            Command::Add { node, .. } => format!("add {}", node.id),
            Command::Update { id, .. } => format!("update {id}"),
            Command::Delete { node, .. } => format!("delete {}", node.id),
            Command::Move { id, .. } => format!("move {id}"),
            Command::Batch { label, .. } => label.clone(),
        }
    }

    /// The node the command is about. Batches report none.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Command::Add { node, .. } | Command::Delete { node, .. } => Some(&node.id),
            Command::Update { id, .. } | Command::Move { id, .. } => Some(id),
            Command::Batch { .. } => None,
        }
    }

    pub fn inverse(&self) -> Command {
        match self {
            Command::Add {
                node,
                parent,
                index,
            } => Command::Delete {
                node: node.clone(),
                parent: parent.clone(),
                index: *index,
            },
            Command::Delete {
                node,
                parent,
                index,
            } => Command::Add {
                node: node.clone(),
                parent: parent.clone(),
                index: *index,
            },
            Command::Update { id, before, after } => Command::Update {
                id: id.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            Command::Move { id, from, to } => Command::Move {
                id: id.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Command::Batch { label, commands } => Command::Batch {
                label: label.clone(),
                commands: commands.iter().rev().map(Command::inverse).collect(),
            },
        }
    }

    /// Apply the forward mutation. A failing batch leaves the tree untouched.
    pub fn apply(&self, tree: &mut ComponentTree) -> EditResult<()> {
        match self {
            Command::Add {
                node,
                parent,
                index,
            } => tree.insert_at(parent, *index, node.clone()),
            Command::Delete { node, .. } => tree.delete_node(&node.id).map(|_| ()),
            Command::Update { id, after, .. } => tree.apply_patch(id, after),
            Command::Move { id, to, .. } => {
                let mut scratch = tree.clone();
                scratch.move_node(id, to.parent.id(), Some(to.index), None)?;
                let position = PropPatch::from([
                    (prop::X.to_string(), Some(json!(to.position.x))),
                    (prop::Y.to_string(), Some(json!(to.position.y))),
                ]);
                scratch.apply_patch(id, &position)?;
                *tree = scratch;
                Ok(())
            }
            Command::Batch { commands, .. } => {
                let mut scratch = tree.clone();
                for command in commands {
                    command.apply(&mut scratch)?;
                }
                *tree = scratch;
                Ok(())
            }
        }
    }
}

/// Bounded undo/redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record a command. Clears the redo stack and drops the oldest entry
    /// past the limit.
    pub fn push(&mut self, command: Command) {
        self.undo_stack.push(command);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last command. Returns its label, or `None` when there is
    /// nothing to undo or the inverse no longer applies to `tree`.
    pub fn undo(&mut self, tree: &mut ComponentTree) -> Option<String> {
        let command = self.undo_stack.pop()?;
        if let Err(err) = command.inverse().apply(tree) {
            log::warn!("Dropping history entry '{}': {}", command.label(), err);
            return None;
        }
        let label = command.label();
        self.redo_stack.push(command);
        Some(label)
    }

    pub fn redo(&mut self, tree: &mut ComponentTree) -> Option<String> {
        let command = self.redo_stack.pop()?;
        if let Err(err) = command.apply(tree) {
            log::warn!("Dropping history entry '{}': {}", command.label(), err);
            return None;
        }
        let label = command.label();
        self.undo_stack.push(command);
        Some(label)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
