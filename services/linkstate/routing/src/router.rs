//! Routing decisions

use linkstate_topology::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Routing decision result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Forward to the given neighbor
    Forward(NodeId),
    /// Deliver locally (we are the destination)
    Local,
    /// No usable entry
    Drop(DropReason),
}

/// Reason for dropping a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// No route to destination
    NoRoute,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoRoute => write!(f, "no route to destination"),
        }
    }
}
