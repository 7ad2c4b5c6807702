//! Dijkstra with next-hop propagation.

use super::ShortestPaths;
use crate::graph::{NodeId, Topology};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, trace};

/// Compute shortest paths from `source` to every router of `topology`.
///
/// When relaxing (u, v) the next hop of v becomes v itself if u is the
/// source, otherwise it inherits the next hop of u. The frontier pops by
/// `(distance, NodeId)`, so among equal-distance candidates the lowest
/// `NodeId` settles first. Relaxation is strict, so the first settled
/// predecessor keeps the route.
pub fn shortest_paths(topology: &Topology, source: NodeId) -> ShortestPaths {
    let count = topology.node_count();
    let mut distances: Vec<Option<u64>> = vec![None; count];
    let mut next_hops: Vec<Option<NodeId>> = vec![None; count];
    let mut hop_counts: Vec<Option<u32>> = vec![None; count];
    let mut settled = vec![false; count];

    if !topology.contains(source) {
        debug!("Shortest path source {} is not in the topology", source);
        return ShortestPaths {
            source,
            distances,
            next_hops,
            hop_counts,
        };
    }

    distances[source.index()] = Some(0);
    next_hops[source.index()] = Some(source);
    hop_counts[source.index()] = Some(0);

    let mut frontier: BinaryHeap<Reverse<(u64, NodeId)>> = BinaryHeap::new();
    frontier.push(Reverse((0, source)));

    while let Some(Reverse((current_dist, current))) = frontier.pop() {
        if settled[current.index()] {
            continue;
        }
        settled[current.index()] = true;

        for edge in topology.edges(current) {
            let neighbor = edge.to.index();
            if settled[neighbor] {
                continue;
            }

            let candidate = current_dist.saturating_add(u64::from(edge.weight));
            if distances[neighbor].map_or(true, |existing| candidate < existing) {
                distances[neighbor] = Some(candidate);
                next_hops[neighbor] = if current == source {
                    Some(edge.to)
                } else {
                    next_hops[current.index()]
                };
                hop_counts[neighbor] = hop_counts[current.index()].map(|hops| hops + 1);
                frontier.push(Reverse((candidate, edge.to)));
            }
        }
    }

    let paths = ShortestPaths {
        source,
        distances,
        next_hops,
        hop_counts,
    };

    let unreachable = paths.unreachable();
    if !unreachable.is_empty() {
        trace!("{} cannot reach {:?}", source, unreachable);
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: NodeId = NodeId(0);
    const B: NodeId = NodeId(1);
    const C: NodeId = NodeId(2);
    const D: NodeId = NodeId(3);

    fn square() -> Topology {
        let mut topology = Topology::new(4);
        topology.add_link(A, B, 1).unwrap();
        topology.add_link(B, C, 1).unwrap();
        topology.add_link(C, D, 1).unwrap();
        topology.add_link(D, A, 1).unwrap();
        topology
    }

    #[test]
    fn test_square_tie_break_prefers_lowest_predecessor() {
        let paths = shortest_paths(&square(), A);
        assert_eq!(paths.distance(C), Some(2));
        assert_eq!(paths.next_hop(C), Some(B));
        assert_eq!(paths.hop_count(C), Some(2));
        assert_eq!(paths.next_hop(D), Some(D));
        assert_eq!(paths.next_hop(A), Some(A));
        assert_eq!(paths.distance(A), Some(0));
    }

    #[test]
    fn test_square_after_removal_goes_the_other_way() {
        let mut topology = square();
        topology.remove_link(A, B).unwrap();

        let paths = shortest_paths(&topology, A);
        assert_eq!(paths.distance(C), Some(2));
        assert_eq!(paths.next_hop(C), Some(D));
        assert_eq!(paths.distance(B), Some(3));
        assert_eq!(paths.next_hop(B), Some(D));
    }

    #[test]
    fn test_disconnected_destinations_have_no_entry() {
        let mut topology = square();
        topology.remove_link(A, B).unwrap();
        topology.remove_link(A, D).unwrap();

        let from_c = shortest_paths(&topology, C);
        assert_eq!(from_c.distance(A), None);
        assert_eq!(from_c.next_hop(A), None);
        assert_eq!(from_c.unreachable(), vec![A]);

        let from_a = shortest_paths(&topology, A);
        assert_eq!(from_a.unreachable(), vec![B, C, D]);
        assert_eq!(from_a.reachable().count(), 1);
    }

    #[test]
    fn test_first_settled_predecessor_keeps_equal_cost_route() {
        let mut topology = Topology::new(4);
        topology.add_link(A, B, 2).unwrap();
        topology.add_link(A, C, 1).unwrap();
        topology.add_link(B, D, 1).unwrap();
        topology.add_link(C, D, 2).unwrap();

        // C settles before B, so the lower-numbered B does not take over
        let paths = shortest_paths(&topology, A);
        assert_eq!(paths.distance(D), Some(3));
        assert_eq!(paths.next_hop(D), Some(C));
    }

    #[test]
    fn test_heavier_direct_link_loses_to_cheaper_detour() {
        let mut topology = Topology::new(3);
        topology.add_link(A, B, 10).unwrap();
        topology.add_link(A, C, 2).unwrap();
        topology.add_link(C, B, 3).unwrap();

        let paths = shortest_paths(&topology, A);
        assert_eq!(paths.distance(B), Some(5));
        assert_eq!(paths.next_hop(B), Some(C));
        assert_eq!(paths.hop_count(B), Some(2));
    }

    #[test]
    fn test_isolated_node_has_only_self_entry() {
        let topology = Topology::new(1);
        let paths = shortest_paths(&topology, A);
        let entries: Vec<_> = paths.reachable().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].destination, A);
        assert_eq!(entries[0].next_hop, A);
        assert_eq!(entries[0].distance, 0);
    }

    #[test]
    fn test_unknown_source() {
        let paths = shortest_paths(&square(), NodeId(9));
        assert_eq!(paths.reachable().count(), 0);
    }
}
