use intrusive_vec::NodeId;
use thiserror::Error;

/// Contract violations reported by the tree operations.
///
/// Ordinary lookup outcomes (not found, already exists, empty, end of
/// sequence) are never errors, they are part of the `Ok` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RbError {
    #[error("node {0} does not resolve in the arena")]
    InvalidNode(NodeId),
    #[error("the tree is not empty, an insertion point is required")]
    MissingInsertionPoint,
    #[error("insertion point {0} does not match the node being inserted")]
    StaleInsertionPoint(NodeId),
    #[error("node {0} is not a member of this tree")]
    NotAMember(NodeId),
}
