//! Network error types.

use linkstate_routing::RoutingError;
use linkstate_topology::{NodeId, TopologyError};
use thiserror::Error;

/// Errors surfaced by the simulated network
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Structural topology error (missing link, duplicate link, bad weight...)
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Routing table computation or lookup error
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Agent mailbox no longer accepts messages
    #[error("mailbox of {0} is closed")]
    MailboxClosed(NodeId),

    /// Agent dropped a control reply without answering
    #[error("{0} dropped the reply")]
    NoReply(NodeId),

    /// Discovery round did not finish in time
    #[error("discovery round timed out: {received} of {expected} outcomes")]
    ProbeTimeout {
        /// Outcomes expected
        expected: usize,
        /// Outcomes received before the deadline
        received: usize,
    },

    /// Every probe of a round was dropped before reporting
    #[error("discovery round abandoned: {received} of {expected} outcomes")]
    RoundAbandoned {
        /// Outcomes expected
        expected: usize,
        /// Outcomes received
        received: usize,
    },

    /// Probe origin and target are the same router
    #[error("{0} cannot probe itself")]
    SelfProbe(NodeId),

    /// Not enough routers to pick distinct probe targets
    #[error("discovery needs at least 2 routers, network has {0}")]
    NotEnoughNodes(usize),

    /// Agent tasks ended abnormally
    #[error("{0} agent tasks failed")]
    AgentFailure(usize),
}
