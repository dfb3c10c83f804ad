use thiserror::Error;

use ut_core::NodeId;

/// Reasons a vehicle cannot be bound to the road network.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NavError {
    #[error("{0} does not exist in the network")]
    UnknownNode(NodeId),

    #[error("{0} is not part of its segment's node chain")]
    NotOnSegment(NodeId),
}

pub type NavResult<T> = Result<T, NavError>;
