//! Link-state shortest path computation.

use crate::graph::NodeId;
use serde::Serialize;

/// One reachable destination in a shortest path run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathEntry {
    /// Destination node
    pub destination: NodeId,
    /// Neighbor of the source on the shortest path (the source itself for the self entry)
    pub next_hop: NodeId,
    /// Total weight of the path
    pub distance: u64,
    /// Number of links on the path
    pub hop_count: u32,
}

/// Single-source shortest paths from one router.
///
/// Destinations that cannot be reached keep no distance and no next hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortestPaths {
    /// Source node
    source: NodeId,
    /// Distance per destination, `None` means unreachable
    distances: Vec<Option<u64>>,
    /// First hop per destination
    next_hops: Vec<Option<NodeId>>,
    /// Link count per destination
    hop_counts: Vec<Option<u32>>,
}

impl ShortestPaths {
    /// Source node of this run
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Shortest distance to `destination`
    pub fn distance(&self, destination: NodeId) -> Option<u64> {
        self.distances.get(destination.index()).copied().flatten()
    }

    /// First hop toward `destination`
    pub fn next_hop(&self, destination: NodeId) -> Option<NodeId> {
        self.next_hops.get(destination.index()).copied().flatten()
    }

    /// Number of links to `destination`
    pub fn hop_count(&self, destination: NodeId) -> Option<u32> {
        self.hop_counts.get(destination.index()).copied().flatten()
    }

    /// Whether `destination` is reachable from the source
    pub fn is_reachable(&self, destination: NodeId) -> bool {
        self.distance(destination).is_some()
    }

    /// Every reachable destination, self entry included, in id order
    pub fn reachable(&self) -> impl Iterator<Item = PathEntry> + '_ {
        (0..self.distances.len()).filter_map(move |index| {
            let destination = NodeId(index);
            Some(PathEntry {
                destination,
                next_hop: self.next_hop(destination)?,
                distance: self.distance(destination)?,
                hop_count: self.hop_count(destination)?,
            })
        })
    }

    /// Destinations disconnected from the source
    pub fn unreachable(&self) -> Vec<NodeId> {
        (0..self.distances.len())
            .map(NodeId)
            .filter(|&destination| !self.is_reachable(destination))
            .collect()
    }
}

mod spf;
pub use spf::shortest_paths;
