//! Per-router next-hop routing table

use crate::error::RoutingError;
use crate::router::{DropReason, RoutingDecision};
use linkstate_topology::{NodeId, ShortestPaths};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::trace;

/// Route toward one destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Neighbor to forward to
    pub next_hop: NodeId,
    /// Total path weight
    pub cost: u64,
    /// Number of links on the path
    pub hop_count: u32,
}

/// Next-hop table of a single router.
///
/// Holds one entry per destination reachable at the time of computation,
/// including the self entry. Tables are rebuilt wholesale on every epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingTable {
    /// Router owning this table
    owner: NodeId,
    /// Routing table: destination -> route
    routes: BTreeMap<NodeId, Route>,
}

impl RoutingTable {
    /// Table holding only the self entry
    pub fn new(owner: NodeId) -> Self {
        let mut routes = BTreeMap::new();
        routes.insert(
            owner,
            Route {
                next_hop: owner,
                cost: 0,
                hop_count: 0,
            },
        );
        Self { owner, routes }
    }

    /// Build the table from a shortest path run
    pub fn from_paths(paths: &ShortestPaths) -> Self {
        let routes = paths
            .reachable()
            .map(|entry| {
                (
                    entry.destination,
                    Route {
                        next_hop: entry.next_hop,
                        cost: entry.distance,
                        hop_count: entry.hop_count,
                    },
                )
            })
            .collect();

        Self {
            owner: paths.source(),
            routes,
        }
    }

    /// Router owning this table
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Get the route to a destination
    pub fn route(&self, destination: NodeId) -> Option<&Route> {
        self.routes.get(&destination)
    }

    /// Next hop toward a destination
    pub fn next_hop(&self, destination: NodeId) -> Result<NodeId, RoutingError> {
        self.route(destination)
            .map(|route| route.next_hop)
            .ok_or(RoutingError::UnreachableDestination {
                from: self.owner,
                to: destination,
            })
    }

    /// Make a forwarding decision for a destination
    pub fn decide(&self, destination: NodeId) -> RoutingDecision {
        if destination == self.owner {
            return RoutingDecision::Local;
        }

        match self.route(destination) {
            Some(route) => RoutingDecision::Forward(route.next_hop),
            None => {
                trace!("{} has no route to {}", self.owner, destination);
                RoutingDecision::Drop(DropReason::NoRoute)
            }
        }
    }

    /// Whether a destination has an entry
    pub fn is_reachable(&self, destination: NodeId) -> bool {
        self.routes.contains_key(&destination)
    }

    /// Number of entries, self entry included
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no entries at all
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All entries in destination order
    pub fn routes(&self) -> impl Iterator<Item = (NodeId, &Route)> {
        self.routes.iter().map(|(destination, route)| (*destination, route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstate_topology::{shortest_paths, Topology};

    fn line() -> Topology {
        let mut topology = Topology::new(4);
        topology.add_link(NodeId(0), NodeId(1), 2).unwrap();
        topology.add_link(NodeId(1), NodeId(2), 3).unwrap();
        topology
    }

    #[test]
    fn test_table_from_paths() {
        let table = RoutingTable::from_paths(&shortest_paths(&line(), NodeId(0)));

        assert_eq!(table.owner(), NodeId(0));
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.route(NodeId(2)),
            Some(&Route {
                next_hop: NodeId(1),
                cost: 5,
                hop_count: 2
            })
        );
        assert_eq!(table.next_hop(NodeId(0)), Ok(NodeId(0)));
        assert!(!table.is_reachable(NodeId(3)));
    }

    #[test]
    fn test_lookup_miss_is_unreachable_destination() {
        let table = RoutingTable::from_paths(&shortest_paths(&line(), NodeId(0)));
        assert_eq!(
            table.next_hop(NodeId(3)),
            Err(RoutingError::UnreachableDestination {
                from: NodeId(0),
                to: NodeId(3)
            })
        );
    }

    #[test]
    fn test_decide() {
        let table = RoutingTable::from_paths(&shortest_paths(&line(), NodeId(1)));
        assert_eq!(table.decide(NodeId(1)), RoutingDecision::Local);
        assert_eq!(table.decide(NodeId(2)), RoutingDecision::Forward(NodeId(2)));
        assert_eq!(table.decide(NodeId(0)), RoutingDecision::Forward(NodeId(0)));
        assert_eq!(table.decide(NodeId(3)), RoutingDecision::Drop(DropReason::NoRoute));
    }

    #[test]
    fn test_decide_agrees_with_next_hop() {
        let mut topology = line();
        topology.add_link(NodeId(2), NodeId(0), 9).unwrap();
        for owner in topology.node_ids() {
            let table = RoutingTable::from_paths(&shortest_paths(&topology, owner));
            for destination in topology.node_ids() {
                let expected = if destination == owner {
                    RoutingDecision::Local
                } else {
                    match table.next_hop(destination) {
                        Ok(next_hop) => {
                            assert_ne!(next_hop, owner);
                            assert!(topology.has_link(owner, next_hop));
                            RoutingDecision::Forward(next_hop)
                        }
                        Err(_) => RoutingDecision::Drop(DropReason::NoRoute),
                    }
                };
                assert_eq!(table.decide(destination), expected);
            }
        }
    }

    #[test]
    fn test_self_only_table() {
        let table = RoutingTable::new(NodeId(7));
        assert_eq!(table.len(), 1);
        assert_eq!(table.next_hop(NodeId(7)), Ok(NodeId(7)));
        assert_eq!(table, RoutingTable::from_paths(&shortest_paths(&Topology::new(8), NodeId(7))));
    }

    #[test]
    fn test_table_serializes_destinations_as_keys() {
        let table = RoutingTable::from_paths(&shortest_paths(&line(), NodeId(0)));
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["owner"], 0);
        assert_eq!(json["routes"]["2"]["next_hop"], 1);
        assert_eq!(json["routes"]["2"]["cost"], 5);
    }
}
