//! Random topology generation.

use crate::graph::{NodeId, Topology};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Minimum number of links each generated router should get
pub const MIN_DEGREE_FLOOR: usize = 2;

/// Attempts per router when topping up degrees
const ATTEMPTS_PER_NODE: usize = 8;

/// Parameters of a random connected topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomTopology {
    /// Number of routers
    pub nodes: usize,
    /// Links each router should reach if partners are available
    pub min_degree: usize,
    /// Hard upper bound on links per router
    pub max_degree: usize,
    /// Link weights are drawn from `1..=weight_ceiling`
    pub weight_ceiling: u32,
}

impl Default for RandomTopology {
    fn default() -> Self {
        Self {
            nodes: 10,
            min_degree: MIN_DEGREE_FLOOR,
            max_degree: 3,
            weight_ceiling: 20,
        }
    }
}

impl RandomTopology {
    /// Build a random topology.
    ///
    /// A random spanning tree is laid down first so the result is always
    /// connected, then routers below `min_degree` are linked to random
    /// partners that still have spare capacity.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Topology {
        let mut topology = Topology::new(self.nodes);
        let max_degree = self.max_degree.max(MIN_DEGREE_FLOOR);
        let ceiling = self.weight_ceiling.max(1);

        let mut order: Vec<NodeId> = topology.node_ids().collect();
        order.shuffle(rng);

        for position in 1..order.len() {
            let node = order[position];
            let candidates: Vec<NodeId> = order[..position]
                .iter()
                .copied()
                .filter(|&other| topology.degree(other) < max_degree)
                .collect();
            // The previous router in the order only holds its parent link, so it always has room
            let parent = candidates
                .choose(rng)
                .copied()
                .unwrap_or(order[position - 1]);
            let weight = rng.gen_range(1..=ceiling);
            if topology.add_link(node, parent, weight).is_err() {
                debug!("Skipped spanning link {}<->{}", node, parent);
            }
        }

        let min_degree = self.min_degree.min(max_degree);
        for node in order.iter().copied() {
            let mut attempts = 0;
            while topology.degree(node) < min_degree && attempts < ATTEMPTS_PER_NODE * self.nodes {
                attempts += 1;
                let other = NodeId(rng.gen_range(0..self.nodes));
                if other == node
                    || topology.has_link(node, other)
                    || topology.degree(other) >= max_degree
                {
                    continue;
                }
                let weight = rng.gen_range(1..=ceiling);
                if topology.add_link(node, other, weight).is_err() {
                    debug!("Skipped extra link {}<->{}", node, other);
                }
            }
        }

        info!(
            "Generated topology with {} routers and {} links",
            topology.node_count(),
            topology.link_count()
        );
        topology
    }
}
