//! Discovery rounds: request/acknowledge exchanges and their completion tracking

use crate::error::NetworkError;
use linkstate_routing::RoutingError;
use linkstate_topology::NodeId;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A completed request/acknowledge exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    /// Router that sent the request
    pub origin: NodeId,
    /// Router that acknowledged
    pub target: NodeId,
    /// Path of the request, origin first
    pub request_route: Vec<NodeId>,
    /// Path of the acknowledgement, target first
    pub ack_route: Vec<NodeId>,
}

impl Exchange {
    /// Links crossed by the request
    pub fn request_hops(&self) -> usize {
        self.request_route.len().saturating_sub(1)
    }

    /// Links crossed by the acknowledgement
    pub fn ack_hops(&self) -> usize {
        self.ack_route.len().saturating_sub(1)
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <-> {} via [{}], ack via [{}]",
            self.origin,
            self.target,
            format_route(&self.request_route),
            format_route(&self.ack_route)
        )
    }
}

/// Render a route as `R1 -> R4 -> R2`
pub fn format_route(route: &[NodeId]) -> String {
    route
        .iter()
        .map(NodeId::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A message that could not be forwarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    /// Router where forwarding failed
    pub at: NodeId,
    /// Message source
    pub source: NodeId,
    /// Message destination
    pub destination: NodeId,
    /// Message kind name
    pub kind: &'static str,
    /// Lookup failure
    pub error: RoutingError,
}

impl fmt::Display for DeadLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {} to {} stopped at {}: {}",
            self.kind, self.source, self.destination, self.at, self.error
        )
    }
}

/// Final outcome of one probe
#[derive(Debug)]
pub(crate) enum Outcome {
    Acknowledged(Exchange),
    DeadLetter(DeadLetter),
}

/// Handle carried by every probe of a round to report its outcome
#[derive(Debug, Clone)]
pub struct Completion {
    acknowledged: Arc<AtomicUsize>,
    outcomes: mpsc::UnboundedSender<Outcome>,
}

impl Completion {
    /// Record a completed exchange
    pub(crate) fn acknowledge(&self, exchange: Exchange) {
        self.acknowledged.fetch_add(1, Ordering::SeqCst);
        if self.outcomes.send(Outcome::Acknowledged(exchange)).is_err() {
            debug!("Acknowledgement arrived after its round finished");
        }
    }

    /// Record a probe that could not be delivered
    pub(crate) fn dead_letter(&self, letter: DeadLetter) {
        if self.outcomes.send(Outcome::DeadLetter(letter)).is_err() {
            debug!("Dead letter arrived after its round finished");
        }
    }
}

/// Results of a discovery round
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Probes launched
    pub expected: usize,
    /// Acknowledgement counter value when the round completed
    pub acknowledged: usize,
    /// Completed exchanges in arrival order
    pub exchanges: Vec<Exchange>,
    /// Probes that hit a missing route
    pub dead_letters: Vec<DeadLetter>,
}

impl DiscoveryReport {
    /// Whether every probe was acknowledged
    pub fn is_complete(&self) -> bool {
        self.acknowledged == self.expected && self.dead_letters.is_empty()
    }
}

/// One traffic-generation epoch of discovery exchanges.
///
/// Owns the acknowledgement counter and the fan-in channel every probe of
/// the round reports to. Waiting blocks on the channel until each launched
/// probe produced exactly one outcome.
#[derive(Debug)]
pub struct DiscoveryRound {
    expected: usize,
    acknowledged: Arc<AtomicUsize>,
    outcomes_tx: Option<mpsc::UnboundedSender<Outcome>>,
    outcomes_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl DiscoveryRound {
    /// Create a round expecting `expected` probe outcomes
    pub fn new(expected: usize) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Self {
            expected,
            acknowledged: Arc::new(AtomicUsize::new(0)),
            outcomes_tx: Some(outcomes_tx),
            outcomes_rx,
        }
    }

    /// Probes expected in this round
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Current acknowledgement count
    pub fn acknowledged(&self) -> usize {
        self.acknowledged.load(Ordering::SeqCst)
    }

    /// Completion handle for one more probe of this round
    pub fn completion(&self) -> Option<Completion> {
        self.outcomes_tx.as_ref().map(|outcomes| Completion {
            acknowledged: self.acknowledged.clone(),
            outcomes: outcomes.clone(),
        })
    }

    /// Wait for every outcome of the round
    pub async fn wait(&mut self, timeout: Duration) -> Result<DiscoveryReport, NetworkError> {
        // Only the probes keep the channel open from here on
        self.outcomes_tx.take();

        let mut report = DiscoveryReport {
            expected: self.expected,
            ..DiscoveryReport::default()
        };
        let expected = self.expected;
        let outcomes_rx = &mut self.outcomes_rx;

        let collect = async {
            while report.exchanges.len() + report.dead_letters.len() < expected {
                match outcomes_rx.recv().await {
                    Some(Outcome::Acknowledged(exchange)) => report.exchanges.push(exchange),
                    Some(Outcome::DeadLetter(letter)) => report.dead_letters.push(letter),
                    None => return false,
                }
            }
            true
        };

        let finished = tokio::time::timeout(timeout, collect).await;
        let received = report.exchanges.len() + report.dead_letters.len();
        match finished {
            Ok(true) => {}
            Ok(false) => {
                warn!("Discovery round abandoned after {} of {} outcomes", received, expected);
                return Err(NetworkError::RoundAbandoned { expected, received });
            }
            Err(_) => {
                warn!("Discovery round timed out after {} of {} outcomes", received, expected);
                return Err(NetworkError::ProbeTimeout { expected, received });
            }
        }

        report.acknowledged = self.acknowledged();
        info!(
            "Discovery round complete: {} of {} acknowledged, {} dead letters",
            report.acknowledged,
            expected,
            report.dead_letters.len()
        );
        Ok(report)
    }
}

/// Pick, for every router, one distinct random other router to probe
pub fn random_pairs<R: Rng>(node_count: usize, rng: &mut R) -> Vec<(NodeId, NodeId)> {
    if node_count < 2 {
        return Vec::new();
    }
    (0..node_count)
        .map(|origin| {
            // Draw from the other n-1 routers and skip over the origin
            let mut target = rng.gen_range(0..node_count - 1);
            if target >= origin {
                target += 1;
            }
            (NodeId(origin), NodeId(target))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn exchange(origin: usize, target: usize) -> Exchange {
        Exchange {
            origin: NodeId(origin),
            target: NodeId(target),
            request_route: vec![NodeId(origin), NodeId(target)],
            ack_route: vec![NodeId(target), NodeId(origin)],
        }
    }

    #[tokio::test]
    async fn test_round_collects_exactly_expected() {
        let mut round = DiscoveryRound::new(2);
        let first = round.completion().unwrap();
        let second = round.completion().unwrap();

        first.acknowledge(exchange(0, 1));
        second.dead_letter(DeadLetter {
            at: NodeId(2),
            source: NodeId(2),
            destination: NodeId(0),
            kind: "discovery-request",
            error: RoutingError::UnreachableDestination {
                from: NodeId(2),
                to: NodeId(0),
            },
        });

        let report = round.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(report.acknowledged, 1);
        assert_eq!(report.exchanges, vec![exchange(0, 1)]);
        assert_eq!(report.dead_letters.len(), 1);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_round_abandoned_when_probes_vanish() {
        let mut round = DiscoveryRound::new(1);
        drop(round.completion());

        let err = round.wait(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, NetworkError::RoundAbandoned { expected: 1, received: 0 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_times_out() {
        let mut round = DiscoveryRound::new(1);
        let _pending = round.completion().unwrap();

        let err = round.wait(Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, NetworkError::ProbeTimeout { expected: 1, received: 0 }));
    }

    #[tokio::test]
    async fn test_empty_round() {
        let mut round = DiscoveryRound::new(0);
        let report = round.wait(Duration::from_secs(1)).await.unwrap();
        assert!(report.is_complete());
        assert!(round.completion().is_none());
    }

    #[test]
    fn test_random_pairs_are_distinct() {
        let mut rng = StdRng::seed_from_u64(9);
        let pairs = random_pairs(6, &mut rng);
        assert_eq!(pairs.len(), 6);
        for (index, (origin, target)) in pairs.iter().enumerate() {
            assert_eq!(origin.index(), index);
            assert_ne!(origin, target);
            assert!(target.index() < 6);
        }
        assert!(random_pairs(1, &mut rng).is_empty());
    }

    #[test]
    fn test_exchange_display() {
        let exchange = Exchange {
            origin: NodeId(0),
            target: NodeId(2),
            request_route: vec![NodeId(0), NodeId(1), NodeId(2)],
            ack_route: vec![NodeId(2), NodeId(1), NodeId(0)],
        };
        assert_eq!(exchange.request_hops(), 2);
        assert_eq!(
            exchange.to_string(),
            "R1 <-> R3 via [R1 -> R2 -> R3], ack via [R3 -> R2 -> R1]"
        );
    }
}
