//! Router agents and the switchboard connecting their mailboxes

use crate::change::ChangeHandler;
use crate::discovery::{DeadLetter, Exchange};
use crate::error::NetworkError;
use crate::inflight::InFlight;
use crate::message::{Envelope, Message, MessageKind, Probe};
use crate::stats::ForwardingStats;
use linkstate_routing::{DropReason, RouteStore, RoutingDecision, RoutingError};
use linkstate_topology::NodeId;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, trace, warn};

/// Mailbox senders of every agent plus the shared in-flight tracker
#[derive(Debug)]
pub(crate) struct Switchboard {
    mailboxes: Vec<mpsc::Sender<Envelope>>,
    in_flight: Arc<InFlight>,
    routes: Arc<RouteStore>,
}

impl Switchboard {
    pub(crate) fn new(
        mailboxes: Vec<mpsc::Sender<Envelope>>,
        in_flight: Arc<InFlight>,
        routes: Arc<RouteStore>,
    ) -> Self {
        Self {
            mailboxes,
            in_flight,
            routes,
        }
    }

    pub(crate) fn in_flight(&self) -> &Arc<InFlight> {
        &self.in_flight
    }

    pub(crate) fn routes(&self) -> &Arc<RouteStore> {
        &self.routes
    }

    /// Deliver `message` to `to` from a short-lived task.
    ///
    /// The in-flight slot is taken before returning, so the caller may
    /// release its own slot right away.
    pub(crate) fn dispatch(&self, to: NodeId, message: Message) {
        let in_flight = self.in_flight.enter();
        let Some(mailbox) = self.mailboxes.get(to.index()).cloned() else {
            error!("No mailbox for {}, dropping {}", to, message.kind.name());
            return;
        };

        tokio::spawn(async move {
            let envelope = Envelope {
                message,
                in_flight,
            };
            if let Err(mpsc::error::SendError(envelope)) = mailbox.send(envelope).await {
                error!(
                    "Mailbox of {} closed, lost {} from {}",
                    to,
                    envelope.message.kind.name(),
                    envelope.message.source
                );
            }
        });
    }

    /// Deliver `message` to `to`, waiting for mailbox capacity
    pub(crate) async fn send(&self, to: NodeId, message: Message) -> Result<(), NetworkError> {
        let mailbox = self
            .mailboxes
            .get(to.index())
            .ok_or(NetworkError::MailboxClosed(to))?;
        let envelope = Envelope {
            message,
            in_flight: self.in_flight.enter(),
        };
        mailbox
            .send(envelope)
            .await
            .map_err(|_| NetworkError::MailboxClosed(to))
    }

    /// Pass `message` from router `at` toward its destination.
    ///
    /// Uses the table of `at` in the epoch current at lookup time. A missing
    /// route turns the message into a dead letter.
    pub(crate) async fn route(&self, at: NodeId, message: Message, stats: &ForwardingStats) {
        let decision = match self.routes.table(at).await {
            Some(table) => table.decide(message.destination),
            None => RoutingDecision::Drop(DropReason::NoRoute),
        };

        match decision {
            RoutingDecision::Forward(next_hop) => {
                trace!(
                    "{} forwarding {} for {} to {}",
                    at,
                    message.kind.name(),
                    message.destination,
                    next_hop
                );
                stats.record_forwarded();
                self.dispatch(next_hop, message);
            }
            RoutingDecision::Local => self.dispatch(at, message),
            RoutingDecision::Drop(reason) => {
                let letter = DeadLetter {
                    at,
                    source: message.source,
                    destination: message.destination,
                    kind: message.kind.name(),
                    error: RoutingError::UnreachableDestination {
                        from: at,
                        to: message.destination,
                    },
                };
                warn!("Dead letter ({}): {}", reason, letter);
                stats.record_dead_letter();

                match message.kind {
                    MessageKind::DiscoveryRequest(probe) | MessageKind::DiscoveryAck(probe) => {
                        probe.completion.dead_letter(letter)
                    }
                    MessageKind::LinkRemoved { .. } | MessageKind::LinkAdded { .. } => {}
                }
            }
        }
    }
}

/// Actor owning one router's mailbox
#[derive(Debug)]
pub(crate) struct NodeAgent {
    mailbox: mpsc::Receiver<Envelope>,
    shutdown: watch::Receiver<bool>,
    handler: Handler,
}

/// Per-router message handling, shared state only
#[derive(Debug)]
struct Handler {
    id: NodeId,
    switchboard: Arc<Switchboard>,
    changes: Arc<ChangeHandler>,
    stats: Arc<ForwardingStats>,
}

impl NodeAgent {
    pub(crate) fn new(
        id: NodeId,
        mailbox: mpsc::Receiver<Envelope>,
        switchboard: Arc<Switchboard>,
        changes: Arc<ChangeHandler>,
        stats: Arc<ForwardingStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            mailbox,
            shutdown,
            handler: Handler {
                id,
                switchboard,
                changes,
                stats,
            },
        }
    }

    /// Receive loop, runs until shutdown is signalled
    pub(crate) async fn run(self) {
        let NodeAgent {
            mut mailbox,
            mut shutdown,
            handler,
        } = self;
        let id = handler.id;
        debug!("Agent {} started", id);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                envelope = mailbox.recv() => {
                    match envelope {
                        Some(envelope) => handler.handle(envelope).await,
                        None => break,
                    }
                }
            }
        }

        mailbox.close();
        let mut leftover = 0usize;
        while let Some(envelope) = mailbox.recv().await {
            leftover += 1;
            debug!(
                "Agent {} discarding {} from {} at shutdown",
                id,
                envelope.message.kind.name(),
                envelope.message.source
            );
        }
        debug!("Agent {} stopped ({} messages drained)", id, leftover);
    }
}

impl Handler {
    async fn handle(&self, envelope: Envelope) {
        // The slot is released when this function returns, after any
        // follow-up message took its own
        let Envelope {
            message,
            in_flight: _in_flight,
        } = envelope;
        let Message {
            source,
            destination,
            kind,
        } = message;

        match kind {
            MessageKind::DiscoveryRequest(mut probe) => {
                probe.request_route.push(self.id);
                if destination == self.id {
                    self.stats.record_delivered();
                    debug!("{} received discovery request from {}", self.id, source);
                    probe.ack_route.push(self.id);
                    let ack = Message {
                        source: self.id,
                        destination: source,
                        kind: MessageKind::DiscoveryAck(probe),
                    };
                    self.switchboard.route(self.id, ack, &self.stats).await;
                } else {
                    let request = Message {
                        source,
                        destination,
                        kind: MessageKind::DiscoveryRequest(probe),
                    };
                    self.switchboard.route(self.id, request, &self.stats).await;
                }
            }
            MessageKind::DiscoveryAck(mut probe) => {
                probe.ack_route.push(self.id);
                if destination == self.id {
                    self.acknowledged(source, probe);
                } else {
                    let ack = Message {
                        source,
                        destination,
                        kind: MessageKind::DiscoveryAck(probe),
                    };
                    self.switchboard.route(self.id, ack, &self.stats).await;
                }
            }
            MessageKind::LinkRemoved { link, reply } => {
                self.stats.record_topology_change();
                let outcome = self.changes.remove_link(link).await;
                if reply.send(outcome).is_err() {
                    debug!("Requester of link {} removal went away", link);
                }
            }
            MessageKind::LinkAdded {
                link,
                weight,
                reply,
            } => {
                self.stats.record_topology_change();
                let outcome = self.changes.add_link(link, weight).await;
                if reply.send(outcome).is_err() {
                    debug!("Requester of link {} addition went away", link);
                }
            }
        }
    }

    fn acknowledged(&self, target: NodeId, probe: Probe) {
        self.stats.record_acknowledged();
        let Probe {
            request_route,
            ack_route,
            completion,
        } = probe;
        let exchange = Exchange {
            origin: self.id,
            target,
            request_route,
            ack_route,
        };
        debug!("Discovery exchange complete: {}", exchange);
        completion.acknowledge(exchange);
    }
}
