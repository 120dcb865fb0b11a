use intrusive_vec::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("node {0} does not resolve in the arena")]
    InvalidNode(NodeId),
    #[error("node {0} is not a member of this list")]
    NotAMember(NodeId),
}
