//! Routing error types.

use linkstate_topology::NodeId;
use thiserror::Error;

/// Routing and table computation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// Forwarding lookup found no entry for the destination
    #[error("no route from {from} to {to}")]
    UnreachableDestination {
        /// Router doing the lookup
        from: NodeId,
        /// Destination that was missing
        to: NodeId,
    },

    /// Fewer tables came back from the worker pool than jobs were queued
    #[error("epoch incomplete: {completed} of {expected} tables computed")]
    IncompleteEpoch {
        /// Jobs queued
        expected: usize,
        /// Tables received
        completed: usize,
    },

    /// A worker died while computing tables
    #[error("route worker failed: {0}")]
    Worker(String),
}
