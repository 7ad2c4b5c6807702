//! Messages exchanged between router agents

use crate::discovery::Completion;
use crate::error::NetworkError;
use crate::inflight::InFlightGuard;
use linkstate_routing::EpochSummary;
use linkstate_topology::{LinkInfo, NodeId};
use tokio::sync::oneshot;

/// Outcome of a topology change, sent back to the requester
pub type ChangeResult = Result<EpochSummary, NetworkError>;

/// A unit of communication between agents
#[derive(Debug)]
pub struct Message {
    /// Originating router
    pub source: NodeId,
    /// Final destination
    pub destination: NodeId,
    /// What the message carries
    pub kind: MessageKind,
}

/// Closed set of message kinds
#[derive(Debug)]
pub enum MessageKind {
    /// Discovery probe travelling toward its target
    DiscoveryRequest(Probe),
    /// Acknowledgement travelling back toward the probe origin
    DiscoveryAck(Probe),
    /// A link went down
    LinkRemoved {
        /// Link to remove
        link: LinkInfo,
        /// Where to report the outcome
        reply: oneshot::Sender<ChangeResult>,
    },
    /// A new link came up
    LinkAdded {
        /// Link to add
        link: LinkInfo,
        /// Link weight, the handler default when absent
        weight: Option<u32>,
        /// Where to report the outcome
        reply: oneshot::Sender<ChangeResult>,
    },
}

impl MessageKind {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::DiscoveryRequest(_) => "discovery-request",
            MessageKind::DiscoveryAck(_) => "discovery-ack",
            MessageKind::LinkRemoved { .. } => "link-removed",
            MessageKind::LinkAdded { .. } => "link-added",
        }
    }
}

/// Payload of a discovery exchange
#[derive(Debug)]
pub struct Probe {
    /// Routers visited by the request, origin first
    pub request_route: Vec<NodeId>,
    /// Routers visited by the acknowledgement, target first
    pub ack_route: Vec<NodeId>,
    /// Completion handle of the round this probe belongs to
    pub(crate) completion: Completion,
}

impl Probe {
    /// Start a probe at `origin`
    pub(crate) fn new(origin: NodeId, completion: Completion) -> Self {
        Self {
            request_route: vec![origin],
            ack_route: Vec::new(),
            completion,
        }
    }
}

/// Message plus its in-flight registration
#[derive(Debug)]
pub(crate) struct Envelope {
    pub(crate) message: Message,
    pub(crate) in_flight: InFlightGuard,
}
