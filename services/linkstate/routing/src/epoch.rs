//! Routing epochs and their publication

use crate::table::RoutingTable;
use linkstate_topology::NodeId;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// One consistent set of routing tables, one per router
#[derive(Debug, Clone)]
pub struct RoutingEpoch {
    /// Epoch number, 0 before the first computation
    number: u64,
    /// Tables indexed by router id
    tables: Vec<Arc<RoutingTable>>,
    /// Wall time spent computing the tables
    computed_in: Duration,
}

impl RoutingEpoch {
    /// Epoch number
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Table of a router
    pub fn table(&self, node: NodeId) -> Option<&Arc<RoutingTable>> {
        self.tables.get(node.index())
    }

    /// All tables in router order
    pub fn tables(&self) -> &[Arc<RoutingTable>] {
        &self.tables
    }

    /// Time spent computing this epoch
    pub fn computed_in(&self) -> Duration {
        self.computed_in
    }

    /// Summary of this epoch
    pub fn summary(&self) -> EpochSummary {
        let nodes = self.tables.len();
        let reachable: usize = self.tables.iter().map(|table| table.len()).sum();
        EpochSummary {
            epoch: self.number,
            tables: nodes,
            unreachable_pairs: nodes * nodes - reachable,
            computed_in: self.computed_in,
        }
    }
}

/// Short description of a published epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EpochSummary {
    /// Epoch number
    pub epoch: u64,
    /// Number of tables
    pub tables: usize,
    /// Ordered (source, destination) pairs without a route
    pub unreachable_pairs: usize,
    /// Computation time
    pub computed_in: Duration,
}

/// Holder of the current routing epoch.
///
/// Publication swaps the whole epoch at once, so readers see either every
/// table of the previous epoch or every table of the new one.
#[derive(Debug)]
pub struct RouteStore {
    /// Current epoch
    current: RwLock<Arc<RoutingEpoch>>,
}

impl RouteStore {
    /// Create a store at epoch 0 with no tables
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(RoutingEpoch {
                number: 0,
                tables: Vec::new(),
                computed_in: Duration::ZERO,
            })),
        }
    }

    /// Snapshot of the current epoch
    pub async fn current(&self) -> Arc<RoutingEpoch> {
        self.current.read().await.clone()
    }

    /// Table of a router in the current epoch
    pub async fn table(&self, node: NodeId) -> Option<Arc<RoutingTable>> {
        self.current.read().await.table(node).cloned()
    }

    /// Current epoch number
    pub async fn epoch_number(&self) -> u64 {
        self.current.read().await.number
    }

    /// Replace every table at once and return the new epoch's summary
    pub async fn publish(&self, tables: Vec<RoutingTable>, computed_in: Duration) -> EpochSummary {
        let tables: Vec<Arc<RoutingTable>> = tables.into_iter().map(Arc::new).collect();

        let mut current = self.current.write().await;
        let epoch = Arc::new(RoutingEpoch {
            number: current.number.wrapping_add(1),
            tables,
            computed_in,
        });
        *current = epoch.clone();
        drop(current);

        let summary = epoch.summary();
        info!(
            "Routing epoch {} published: {} tables, {} unreachable pairs, computed in {:?}",
            summary.epoch, summary.tables, summary.unreachable_pairs, summary.computed_in
        );
        summary
    }
}

impl Default for RouteStore {
    fn default() -> Self {
        Self::new()
    }
}
