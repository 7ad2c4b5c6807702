//! Network lifecycle: launch, discovery, link changes and shutdown.
//!
//! [`Network::launch`] computes the first routing epoch, creates one bounded
//! mailbox per router and spawns the router agents. Link changes are sent as
//! control messages to the first endpoint's agent, which hands them to the
//! shared [`ChangeHandler`] and replies with the new epoch. Shutdown waits
//! until every dispatched message has been handled before it stops the
//! agents.

use crate::agent::{NodeAgent, Switchboard};
use crate::change::ChangeHandler;
use crate::discovery::{random_pairs, DiscoveryReport, DiscoveryRound};
use crate::error::NetworkError;
use crate::inflight::InFlight;
use crate::message::{ChangeResult, Message, MessageKind, Probe};
use crate::stats::{ForwardingStats, StatsSnapshot};
use linkstate_routing::{Coordinator, EpochSummary, RouteStore, RoutingEpoch, RoutingTable};
use linkstate_topology::{LinkInfo, NodeId, Topology, TopologyError};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Runtime parameters of a simulated network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Route computation threads, 0 for available parallelism
    pub workers: usize,
    /// Capacity of each agent mailbox
    pub mailbox_capacity: usize,
    /// Weight of added links that specify none
    pub default_link_weight: u32,
    /// Upper bound on a discovery round
    pub discovery_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            mailbox_capacity: 1,
            default_link_weight: 1,
            discovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle to a running set of router agents
#[derive(Debug)]
pub struct Network {
    names: Vec<String>,
    config: NetworkConfig,
    switchboard: Arc<Switchboard>,
    changes: Arc<ChangeHandler>,
    stats: Vec<Arc<ForwardingStats>>,
    shutdown: watch::Sender<bool>,
    agents: Vec<JoinHandle<()>>,
}

impl Network {
    /// Compute the first epoch for `topology` and start one agent per router
    pub async fn launch(topology: Topology, config: NetworkConfig) -> Result<Self, NetworkError> {
        let node_count = topology.node_count();
        let names: Vec<String> = topology
            .node_ids()
            .map(|node| topology.name(node).unwrap_or_default().to_string())
            .collect();

        let routes = Arc::new(RouteStore::new());
        let coordinator = Coordinator::new(config.workers);
        info!(
            "Launching {} routers with {} links ({} route workers)",
            node_count,
            topology.link_count(),
            coordinator.workers()
        );
        let changes = Arc::new(ChangeHandler::new(
            topology,
            coordinator,
            routes.clone(),
            config.default_link_weight,
        ));
        changes.recompute().await?;

        let capacity = config.mailbox_capacity.max(1);
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..node_count).map(|_| mpsc::channel(capacity)).unzip();
        let switchboard = Arc::new(Switchboard::new(
            senders,
            Arc::new(InFlight::new()),
            routes,
        ));

        let (shutdown, shutdown_rx) = watch::channel(false);
        let stats: Vec<Arc<ForwardingStats>> = (0..node_count)
            .map(|_| Arc::new(ForwardingStats::default()))
            .collect();

        let agents = receivers
            .into_iter()
            .enumerate()
            .map(|(index, mailbox)| {
                let agent = NodeAgent::new(
                    NodeId(index),
                    mailbox,
                    switchboard.clone(),
                    changes.clone(),
                    stats[index].clone(),
                    shutdown_rx.clone(),
                );
                tokio::spawn(agent.run())
            })
            .collect();

        info!("Network running with {} agents", node_count);
        Ok(Self {
            names,
            config,
            switchboard,
            changes,
            stats,
            shutdown,
            agents,
        })
    }

    /// Number of routers
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Display name of a router
    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.names.get(node.index()).map(String::as_str)
    }

    /// Runtime parameters
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Table of a router in the current epoch
    pub async fn routing_table(&self, node: NodeId) -> Option<Arc<RoutingTable>> {
        self.switchboard.routes().table(node).await
    }

    /// Current routing epoch
    pub async fn epoch(&self) -> Arc<RoutingEpoch> {
        self.switchboard.routes().current().await
    }

    /// Copy of the current topology
    pub async fn topology(&self) -> Topology {
        self.changes.snapshot().await
    }

    /// Messages dispatched but not handled yet
    pub fn in_flight(&self) -> usize {
        self.switchboard.in_flight().count()
    }

    /// Run a single discovery exchange from `origin` to `target`
    pub async fn probe(&self, origin: NodeId, target: NodeId) -> Result<DiscoveryReport, NetworkError> {
        self.discovery_between(&[(origin, target)]).await
    }

    /// Let every router probe one distinct random other router
    pub async fn discovery_round<R: Rng>(&self, rng: &mut R) -> Result<DiscoveryReport, NetworkError> {
        let node_count = self.node_count();
        if node_count < 2 {
            return Err(NetworkError::NotEnoughNodes(node_count));
        }
        let pairs = random_pairs(node_count, rng);
        self.discovery_between(&pairs).await
    }

    /// Run one discovery round over the given (origin, target) pairs
    pub async fn discovery_between(
        &self,
        pairs: &[(NodeId, NodeId)],
    ) -> Result<DiscoveryReport, NetworkError> {
        for &(origin, target) in pairs {
            self.check_node(origin)?;
            self.check_node(target)?;
            if origin == target {
                return Err(NetworkError::SelfProbe(origin));
            }
        }

        let mut round = DiscoveryRound::new(pairs.len());
        info!("Starting discovery round with {} probes", pairs.len());

        for &(origin, target) in pairs {
            let Some(completion) = round.completion() else {
                break;
            };
            debug!("{} probing {}", origin, target);
            let request = Message {
                source: origin,
                destination: target,
                kind: MessageKind::DiscoveryRequest(Probe::new(origin, completion)),
            };
            self.switchboard
                .route(origin, request, &self.stats[origin.index()])
                .await;
        }

        round.wait(self.config.discovery_timeout).await
    }

    /// Take the link between `link.a` and `link.b` down
    pub async fn remove_link(&self, link: LinkInfo) -> Result<EpochSummary, NetworkError> {
        self.control(link, |reply| MessageKind::LinkRemoved { link, reply })
            .await
    }

    /// Bring a link up between `link.a` and `link.b`
    pub async fn add_link(
        &self,
        link: LinkInfo,
        weight: Option<u32>,
    ) -> Result<EpochSummary, NetworkError> {
        self.control(link, |reply| MessageKind::LinkAdded {
            link,
            weight,
            reply,
        })
        .await
    }

    async fn control<F>(&self, link: LinkInfo, kind: F) -> Result<EpochSummary, NetworkError>
    where
        F: FnOnce(oneshot::Sender<ChangeResult>) -> MessageKind,
    {
        self.check_node(link.a)?;
        let (reply, outcome) = oneshot::channel();
        let message = Message {
            source: link.a,
            destination: link.a,
            kind: kind(reply),
        };
        self.switchboard.send(link.a, message).await?;
        outcome.await.map_err(|_| NetworkError::NoReply(link.a))?
    }

    /// Counters of one router
    pub fn node_stats(&self, node: NodeId) -> Option<StatsSnapshot> {
        self.stats.get(node.index()).map(|stats| stats.snapshot())
    }

    /// Counters summed over every router
    pub fn stats(&self) -> StatsSnapshot {
        let mut total = StatsSnapshot::default();
        for stats in &self.stats {
            total += stats.snapshot();
        }
        total
    }

    /// Drain in-flight messages, stop every agent and return the final counters
    pub async fn shutdown(self) -> Result<StatsSnapshot, NetworkError> {
        info!("Shutting down: waiting for {} in-flight messages", self.in_flight());
        self.switchboard.in_flight().wait_idle().await;

        if self.shutdown.send(true).is_err() {
            debug!("Every agent already stopped");
        }

        let failed = futures::future::join_all(self.agents)
            .await
            .into_iter()
            .filter(|joined| match joined {
                Ok(()) => false,
                Err(e) => {
                    error!("Agent task failed: {}", e);
                    true
                }
            })
            .count();
        if failed > 0 {
            return Err(NetworkError::AgentFailure(failed));
        }

        let mut total = StatsSnapshot::default();
        for stats in &self.stats {
            total += stats.snapshot();
        }
        info!("Network stopped: {:?}", total);
        Ok(total)
    }

    fn check_node(&self, node: NodeId) -> Result<(), NetworkError> {
        if node.index() < self.node_count() {
            Ok(())
        } else {
            Err(TopologyError::UnknownNode(node).into())
        }
    }
}
