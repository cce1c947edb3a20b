//! Error types for tree and editor operations.

use thiserror::Error;

/// Reasons a mutation was refused.
///
/// Every variant describes an expected condition. The tree is left untouched
/// whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("Node not found: {0}")]
    NotFound(String),
    #[error("Duplicate node id: {0}")]
    DuplicateId(String),
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    #[error("Node is not a container: {0}")]
    NotAContainer(String),
    #[error("Cannot move {node} into its own descendant {target}")]
    Cycle { node: String, target: String },
    #[error("The editing root container {0} cannot be deleted")]
    ProtectedRoot(String),
    #[error("Grouping needs at least two nodes")]
    NothingToGroup,
    #[error("Node {0} has no children to ungroup")]
    NothingToUngroup(String),
}

/// Result type for editing operations.
pub type EditResult<T> = Result<T, EditError>;
