//! Topology arena: routers, weighted links and link mutation.

use crate::error::TopologyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Index of a router in the topology arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0 + 1)
    }
}

/// Directed half of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Node at the far end
    pub to: NodeId,
    /// Link weight, always positive
    pub weight: u32,
}

/// Endpoints of a link targeted for addition or removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkInfo {
    /// First endpoint
    pub a: NodeId,
    /// Second endpoint
    pub b: NodeId,
}

impl LinkInfo {
    /// Create a new link descriptor
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self { a, b }
    }
}

impl fmt::Display for LinkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.a, self.b)
    }
}

/// A router in the topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    edges: Vec<Edge>,
}

impl Node {
    /// Router name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adjacent edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of links attached to this router
    pub fn degree(&self) -> usize {
        self.edges.len()
    }

    fn position_of(&self, to: NodeId) -> Option<usize> {
        self.edges.iter().position(|edge| edge.to == to)
    }
}

/// Check a raw weight coming from outside the core
pub fn validate_weight(raw: i64) -> Result<u32, TopologyError> {
    if raw <= 0 {
        return Err(TopologyError::InvalidWeight(raw));
    }
    u32::try_from(raw).map_err(|_| TopologyError::InvalidWeight(raw))
}

/// Graph of routers connected by weighted bidirectional links.
///
/// Every link is stored as a matched pair of edges (A→B and B→A) with the
/// same weight. Both halves are always inserted and removed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    nodes: Vec<Node>,
}

impl Topology {
    /// Create a topology of `count` unlinked routers named `R1..Rn`
    pub fn new(count: usize) -> Self {
        let mut topology = Self::default();
        for index in 0..count {
            topology.add_node(NodeId(index).to_string());
        }
        topology
    }

    /// Append an unlinked router and return its id
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            edges: Vec::new(),
        });
        id
    }

    /// Number of routers
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the topology has no routers
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every router in arena order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Whether `id` names a router of this topology
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Get a router by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Router name, if the id is known
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(Node::name)
    }

    /// Find a router by name
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|node| node.name == name).map(NodeId)
    }

    /// Edges leaving `id`; empty for unknown ids
    pub fn edges(&self, id: NodeId) -> &[Edge] {
        self.node(id).map(Node::edges).unwrap_or(&[])
    }

    /// Adjacent routers of `id`
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges(id).iter().map(|edge| edge.to)
    }

    /// Number of links attached to `id`
    pub fn degree(&self, id: NodeId) -> usize {
        self.edges(id).len()
    }

    /// Weight of the link between `a` and `b`, if any
    pub fn link_weight(&self, a: NodeId, b: NodeId) -> Option<u32> {
        self.edges(a)
            .iter()
            .find(|edge| edge.to == b)
            .map(|edge| edge.weight)
    }

    /// Whether `a` and `b` are directly linked
    pub fn has_link(&self, a: NodeId, b: NodeId) -> bool {
        self.link_weight(a, b).is_some()
    }

    /// Total number of bidirectional links
    pub fn link_count(&self) -> usize {
        self.nodes.iter().map(Node::degree).sum::<usize>() / 2
    }

    /// Every link once, with its weight, lower endpoint first
    pub fn links(&self) -> Vec<(LinkInfo, u32)> {
        let mut links = Vec::with_capacity(self.link_count());
        for a in self.node_ids() {
            for edge in self.edges(a) {
                if a < edge.to {
                    links.push((LinkInfo::new(a, edge.to), edge.weight));
                }
            }
        }
        links
    }

    /// Insert the edge pair `a`↔`b` with `weight`
    pub fn add_link(&mut self, a: NodeId, b: NodeId, weight: u32) -> Result<(), TopologyError> {
        self.check_endpoints(a, b)?;
        if weight == 0 {
            return Err(TopologyError::InvalidWeight(0));
        }
        if self.has_link(a, b) {
            return Err(TopologyError::LinkAlreadyExists { a, b });
        }

        self.nodes[a.index()].edges.push(Edge { to: b, weight });
        self.nodes[b.index()].edges.push(Edge { to: a, weight });
        debug!("Added link {}<->{} (weight {})", a, b, weight);
        Ok(())
    }

    /// Remove the edge pair `a`↔`b`, returning its weight
    pub fn remove_link(&mut self, a: NodeId, b: NodeId) -> Result<u32, TopologyError> {
        self.check_endpoints(a, b)?;

        // Locate both halves before touching either list
        let (Some(pos_a), Some(pos_b)) = (
            self.nodes[a.index()].position_of(b),
            self.nodes[b.index()].position_of(a),
        ) else {
            return Err(TopologyError::LinkNotFound { a, b });
        };

        let removed = self.nodes[a.index()].edges.remove(pos_a);
        self.nodes[b.index()].edges.remove(pos_b);
        debug!("Removed link {}<->{} (weight {})", a, b, removed.weight);
        Ok(removed.weight)
    }

    /// Check the matched-pair invariant over the whole graph
    pub fn is_symmetric(&self) -> bool {
        self.node_ids().all(|a| {
            self.edges(a)
                .iter()
                .all(|edge| self.link_weight(edge.to, a) == Some(edge.weight))
        })
    }

    fn check_endpoints(&self, a: NodeId, b: NodeId) -> Result<(), TopologyError> {
        if !self.contains(a) {
            return Err(TopologyError::UnknownNode(a));
        }
        if !self.contains(b) {
            return Err(TopologyError::UnknownNode(b));
        }
        if a == b {
            return Err(TopologyError::SelfLink(a));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_topology_names() {
        let topology = Topology::new(3);
        assert_eq!(topology.node_count(), 3);
        assert_eq!(topology.name(NodeId(0)), Some("R1"));
        assert_eq!(topology.name(NodeId(2)), Some("R3"));
        assert_eq!(topology.lookup("R2"), Some(NodeId(1)));
        assert_eq!(topology.lookup("R9"), None);
        assert_eq!(topology.link_count(), 0);
    }

    #[test]
    fn test_add_link_creates_matched_pair() {
        let mut topology = Topology::new(3);
        topology.add_link(NodeId(0), NodeId(2), 7).unwrap();

        assert_eq!(topology.link_weight(NodeId(0), NodeId(2)), Some(7));
        assert_eq!(topology.link_weight(NodeId(2), NodeId(0)), Some(7));
        assert_eq!(topology.link_count(), 1);
        assert!(topology.is_symmetric());
        assert_eq!(topology.links(), vec![(LinkInfo::new(NodeId(0), NodeId(2)), 7)]);
    }

    #[test]
    fn test_add_link_rejections() {
        let mut topology = Topology::new(2);
        topology.add_link(NodeId(0), NodeId(1), 1).unwrap();
        let before = topology.clone();

        assert_eq!(
            topology.add_link(NodeId(1), NodeId(0), 4),
            Err(TopologyError::LinkAlreadyExists { a: NodeId(1), b: NodeId(0) })
        );
        assert_eq!(
            topology.add_link(NodeId(0), NodeId(0), 1),
            Err(TopologyError::SelfLink(NodeId(0)))
        );
        assert_eq!(
            topology.add_link(NodeId(0), NodeId(5), 1),
            Err(TopologyError::UnknownNode(NodeId(5)))
        );

        let mut fresh = Topology::new(2);
        assert_eq!(
            fresh.add_link(NodeId(0), NodeId(1), 0),
            Err(TopologyError::InvalidWeight(0))
        );
        assert_eq!(topology, before);
    }

    #[test]
    fn test_remove_link() {
        let mut topology = Topology::new(3);
        topology.add_link(NodeId(0), NodeId(1), 3).unwrap();
        topology.add_link(NodeId(0), NodeId(2), 5).unwrap();

        assert_eq!(topology.remove_link(NodeId(1), NodeId(0)), Ok(3));
        assert!(!topology.has_link(NodeId(0), NodeId(1)));
        assert!(!topology.has_link(NodeId(1), NodeId(0)));
        assert_eq!(topology.neighbors(NodeId(0)).collect::<Vec<_>>(), vec![NodeId(2)]);
        assert!(topology.is_symmetric());
    }

    #[test]
    fn test_remove_missing_link_is_noop() {
        let mut topology = Topology::new(3);
        topology.add_link(NodeId(0), NodeId(1), 3).unwrap();
        let before = topology.clone();

        let err = topology.remove_link(NodeId(1), NodeId(2)).unwrap_err();
        assert_eq!(err, TopologyError::LinkNotFound { a: NodeId(1), b: NodeId(2) });
        assert!(err.is_noop());
        assert_eq!(topology, before);
    }

    #[test]
    fn test_validate_weight() {
        assert_eq!(validate_weight(12), Ok(12));
        assert_eq!(validate_weight(0), Err(TopologyError::InvalidWeight(0)));
        assert_eq!(validate_weight(-3), Err(TopologyError::InvalidWeight(-3)));
        assert!(validate_weight(i64::MAX).is_err());
    }

    #[test]
    fn test_node_id_serializes_as_index() {
        let json = serde_json::to_string(&NodeId(4)).unwrap();
        assert_eq!(json, "4");
        assert_eq!(NodeId(4).to_string(), "R5");
    }
}
