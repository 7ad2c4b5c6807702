//! Topology change handling.
//!
//! The handler is the single mutator of the topology. A change holds the
//! topology lock across mutation, recomputation and publication, so two
//! changes never interleave and every published epoch reflects exactly the
//! topology that was current when it was computed. Forwarding only reads the
//! route store and never takes this lock.

use crate::error::NetworkError;
use linkstate_routing::{Coordinator, EpochSummary, RouteStore};
use linkstate_topology::{LinkInfo, Topology, TopologyError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Applies link changes and publishes the resulting routing epoch
#[derive(Debug)]
pub struct ChangeHandler {
    topology: Mutex<Topology>,
    coordinator: Coordinator,
    routes: Arc<RouteStore>,
    default_weight: u32,
}

impl ChangeHandler {
    /// Create a handler owning `topology`
    pub fn new(
        topology: Topology,
        coordinator: Coordinator,
        routes: Arc<RouteStore>,
        default_weight: u32,
    ) -> Self {
        Self {
            topology: Mutex::new(topology),
            coordinator,
            routes,
            default_weight,
        }
    }

    /// Route store the handler publishes to
    pub fn routes(&self) -> &Arc<RouteStore> {
        &self.routes
    }

    /// Weight used when an added link has none
    pub fn default_weight(&self) -> u32 {
        self.default_weight
    }

    /// Copy of the current topology
    pub async fn snapshot(&self) -> Topology {
        self.topology.lock().await.clone()
    }

    /// Recompute and publish routes for the current topology
    pub async fn recompute(&self) -> Result<EpochSummary, NetworkError> {
        let topology = self.topology.lock().await;
        self.publish(&topology).await
    }

    /// Remove a link and publish the new epoch
    pub async fn remove_link(&self, link: LinkInfo) -> Result<EpochSummary, NetworkError> {
        let mut topology = self.topology.lock().await;

        let weight = match topology.remove_link(link.a, link.b) {
            Ok(weight) => weight,
            Err(e) => return Err(rejected("remove", link, e)),
        };
        info!("Link {} (weight {}) removed", link, weight);

        match self.publish(&topology).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                // Keep topology and published routes in agreement
                topology.add_link(link.a, link.b, weight)?;
                Err(e)
            }
        }
    }

    /// Add a link and publish the new epoch
    pub async fn add_link(
        &self,
        link: LinkInfo,
        weight: Option<u32>,
    ) -> Result<EpochSummary, NetworkError> {
        let weight = weight.unwrap_or(self.default_weight);
        let mut topology = self.topology.lock().await;

        if let Err(e) = topology.add_link(link.a, link.b, weight) {
            return Err(rejected("add", link, e));
        }
        info!("Link {} added with weight {}", link, weight);

        match self.publish(&topology).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                topology.remove_link(link.a, link.b)?;
                Err(e)
            }
        }
    }

    async fn publish(&self, topology: &Topology) -> Result<EpochSummary, NetworkError> {
        let started = Instant::now();
        let snapshot = Arc::new(topology.clone());
        match self.coordinator.recompute(snapshot).await {
            Ok(tables) => Ok(self.routes.publish(tables, started.elapsed()).await),
            Err(e) => {
                error!("Routing recomputation failed: {}", e);
                Err(e.into())
            }
        }
    }
}

fn rejected(action: &str, link: LinkInfo, e: TopologyError) -> NetworkError {
    if e.is_noop() {
        warn!("Ignoring {} of link {}: {}", action, link, e);
    } else {
        warn!("Rejected {} of link {}: {}", action, link, e);
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstate_topology::NodeId;

    fn square() -> Topology {
        let mut topology = Topology::new(4);
        topology.add_link(NodeId(0), NodeId(1), 1).unwrap();
        topology.add_link(NodeId(1), NodeId(2), 1).unwrap();
        topology.add_link(NodeId(2), NodeId(3), 1).unwrap();
        topology.add_link(NodeId(3), NodeId(0), 1).unwrap();
        topology
    }

    async fn handler() -> ChangeHandler {
        let handler = ChangeHandler::new(
            square(),
            Coordinator::new(2),
            Arc::new(RouteStore::new()),
            5,
        );
        handler.recompute().await.unwrap();
        handler
    }

    #[tokio::test]
    async fn test_remove_publishes_new_epoch() {
        let handler = handler().await;
        let summary = handler
            .remove_link(LinkInfo::new(NodeId(0), NodeId(1)))
            .await
            .unwrap();

        assert_eq!(summary.epoch, 2);
        let table = handler.routes().table(NodeId(0)).await.unwrap();
        assert_eq!(table.next_hop(NodeId(2)), Ok(NodeId(3)));
        assert!(!handler.snapshot().await.has_link(NodeId(0), NodeId(1)));
    }

    #[tokio::test]
    async fn test_noop_changes_keep_epoch() {
        let handler = handler().await;
        let before = handler.routes().current().await;

        let err = handler
            .remove_link(LinkInfo::new(NodeId(0), NodeId(2)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Topology(TopologyError::LinkNotFound { .. })
        ));

        let err = handler
            .add_link(LinkInfo::new(NodeId(1), NodeId(0)), Some(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Topology(TopologyError::LinkAlreadyExists { .. })
        ));

        let after = handler.routes().current().await;
        assert_eq!(after.number(), 1);
        assert_eq!(before.tables(), after.tables());
        assert_eq!(handler.snapshot().await, square());
    }

    #[tokio::test]
    async fn test_add_uses_default_weight() {
        let handler = handler().await;
        handler
            .add_link(LinkInfo::new(NodeId(0), NodeId(2)), None)
            .await
            .unwrap();
        assert_eq!(handler.snapshot().await.link_weight(NodeId(2), NodeId(0)), Some(5));

        // Cost 5 direct loses to cost 2 around the square
        let table = handler.routes().table(NodeId(0)).await.unwrap();
        assert_eq!(table.route(NodeId(2)).map(|route| route.cost), Some(2));
    }

    #[tokio::test]
    async fn test_invalid_changes_rejected() {
        let handler = handler().await;
        let err = handler
            .add_link(LinkInfo::new(NodeId(0), NodeId(2)), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Topology(TopologyError::InvalidWeight(0))
        ));

        let err = handler
            .add_link(LinkInfo::new(NodeId(0), NodeId(9)), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::Topology(TopologyError::UnknownNode(NodeId(9)))
        ));
        assert_eq!(handler.routes().epoch_number().await, 1);
    }
}
