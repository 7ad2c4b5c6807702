//! Topology error types.

use crate::graph::NodeId;
use thiserror::Error;

/// Topology mutation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Link weight is zero or negative
    #[error("invalid link weight {0}: weights must be positive")]
    InvalidWeight(i64),

    /// Remove requested on a pair that is not linked
    #[error("no link between {a} and {b}")]
    LinkNotFound {
        /// First endpoint
        a: NodeId,
        /// Second endpoint
        b: NodeId,
    },

    /// Add requested on a pair that is already linked
    #[error("link between {a} and {b} already exists")]
    LinkAlreadyExists {
        /// First endpoint
        a: NodeId,
        /// Second endpoint
        b: NodeId,
    },

    /// Node is not part of the topology
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Both endpoints of a link are the same node
    #[error("cannot link {0} to itself")]
    SelfLink(NodeId),
}

impl TopologyError {
    /// Whether the error is a no-op the caller may ignore
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            TopologyError::LinkNotFound { .. } | TopologyError::LinkAlreadyExists { .. }
        )
    }
}
