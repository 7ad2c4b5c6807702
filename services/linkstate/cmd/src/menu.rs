//! Interactive operator console.
//!
//! Reads commands from stdin and drives the running network. Parsing is kept
//! apart from I/O so that invalid input only ever leads to a new prompt.

use anyhow::Result;
use linkstate_agent::{DiscoveryReport, Network, NetworkError};
use linkstate_routing::{EpochSummary, RoutingTable};
use linkstate_topology::{validate_weight, LinkInfo, NodeId, TopologyError};
use rand::rngs::StdRng;
use std::io::Write;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const MENU: &str = "
1 - Add a link
2 - Remove a link
3 - Run discovery across the whole network
4 - Run discovery between two routers
5 - Shut down
6 - Show a routing table";

/// Operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Bring a new link up
    AddLink,
    /// Take an existing link down
    RemoveLink,
    /// Every router probes a random other router
    TrafficAll,
    /// One probe between two chosen routers
    TrafficPair,
    /// Drain and stop
    Shutdown,
    /// Print one router's table
    ShowTable,
}

impl Command {
    /// Parse a menu choice
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Command::AddLink),
            "2" => Some(Command::RemoveLink),
            "3" => Some(Command::TrafficAll),
            "4" => Some(Command::TrafficPair),
            "5" => Some(Command::Shutdown),
            "6" => Some(Command::ShowTable),
            _ => None,
        }
    }
}

/// Rejected operator input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    /// Not a router number
    #[error("{0:?} is not a router number")]
    NotARouter(String),

    /// Router number outside `1..=count`
    #[error("there is no router R{number}, routers are R1 to R{count}")]
    OutOfRange {
        /// Number entered
        number: usize,
        /// Routers in the network
        count: usize,
    },

    /// Same router entered twice
    #[error("choose a router other than {0}")]
    SameRouter(NodeId),

    /// Weight is not a positive integer
    #[error("{0:?} is not a weight")]
    NotAWeight(String),

    /// Weight rejected by the topology
    #[error(transparent)]
    Weight(#[from] TopologyError),
}

/// Parse a router given as `R3`, `r3` or `3`
pub fn parse_router(input: &str, node_count: usize) -> Result<NodeId, InputError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix('R')
        .or_else(|| trimmed.strip_prefix('r'))
        .unwrap_or(trimmed);
    let number: usize = digits
        .parse()
        .map_err(|_| InputError::NotARouter(trimmed.to_string()))?;
    if number == 0 || number > node_count {
        return Err(InputError::OutOfRange {
            number,
            count: node_count,
        });
    }
    Ok(NodeId(number - 1))
}

/// Parse a link weight; blank input selects the default
pub fn parse_weight(input: &str) -> Result<Option<u32>, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let raw: i64 = trimmed
        .parse()
        .map_err(|_| InputError::NotAWeight(trimmed.to_string()))?;
    Ok(Some(validate_weight(raw)?))
}

/// Line-oriented stdin reader
pub struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    /// Console reading from the process stdin
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `text` and read one line, `None` at end of input
    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        print!("{}", text);
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }

    async fn read_router(
        &mut self,
        text: &str,
        node_count: usize,
        other_than: Option<NodeId>,
    ) -> Result<Option<NodeId>> {
        loop {
            let Some(line) = self.prompt(text).await? else {
                return Ok(None);
            };
            match parse_router(&line, node_count) {
                Ok(node) if Some(node) == other_than => {
                    println!("Invalid input: {}", InputError::SameRouter(node))
                }
                Ok(node) => return Ok(Some(node)),
                Err(e) => println!("Invalid input: {}", e),
            }
        }
    }

    async fn read_weight(&mut self, default: u32) -> Result<Option<Option<u32>>> {
        let text = format!("Link weight (blank for {}): ", default);
        loop {
            let Some(line) = self.prompt(&text).await? else {
                return Ok(None);
            };
            match parse_weight(&line) {
                Ok(weight) => return Ok(Some(weight)),
                Err(e) => println!("Invalid input: {}", e),
            }
        }
    }

    async fn read_link(&mut self, network: &Network, adding: bool) -> Result<Option<LinkInfo>> {
        let count = network.node_count();
        let Some(a) = self.read_router("Router: R", count, None).await? else {
            return Ok(None);
        };

        let topology = network.topology().await;
        let neighbors: Vec<String> = topology.neighbors(a).map(|n| n.to_string()).collect();
        if neighbors.is_empty() {
            println!("{} has no neighbors", a);
        } else {
            println!("Neighbors of {}: {}", a, neighbors.join(", "));
        }

        let text = if adding {
            format!("Router not yet linked to {}: R", a)
        } else {
            format!("Neighbor of {}: R", a)
        };
        let Some(b) = self.read_router(&text, count, Some(a)).await? else {
            return Ok(None);
        };
        Ok(Some(LinkInfo::new(a, b)))
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the menu until the operator asks to shut down or stdin ends
pub async fn run(network: &Network, console: &mut Console, rng: &mut StdRng) -> Result<()> {
    loop {
        println!("{}", MENU);
        let Some(line) = console.prompt("Command 1-6: ").await? else {
            crate::component_info!("menu", "End of input, shutting down");
            return Ok(());
        };
        let Some(command) = Command::parse(&line) else {
            println!("Invalid input: enter a number from 1 to 6");
            continue;
        };
        crate::component_debug!("menu", "Operator chose {:?}", command);

        match command {
            Command::AddLink => {
                let Some(link) = console.read_link(network, true).await? else {
                    return Ok(());
                };
                let default = network.config().default_link_weight;
                let Some(weight) = console.read_weight(default).await? else {
                    return Ok(());
                };
                print_change(network.add_link(link, weight).await);
            }
            Command::RemoveLink => {
                let Some(link) = console.read_link(network, false).await? else {
                    return Ok(());
                };
                print_change(network.remove_link(link).await);
            }
            Command::TrafficAll => print_discovery(network.discovery_round(rng).await),
            Command::TrafficPair => {
                let count = network.node_count();
                let Some(origin) = console.read_router("Router: R", count, None).await? else {
                    return Ok(());
                };
                let Some(target) = console
                    .read_router("Other router: R", count, Some(origin))
                    .await?
                else {
                    return Ok(());
                };
                print_discovery(network.probe(origin, target).await);
            }
            Command::ShowTable => {
                let count = network.node_count();
                let Some(node) = console.read_router("Router: R", count, None).await? else {
                    return Ok(());
                };
                match network.routing_table(node).await {
                    Some(table) => print_table(&table),
                    None => println!("{} has no routing table", node),
                }
            }
            Command::Shutdown => return Ok(()),
        }
    }
}

/// Print the outcome of a link change
pub fn print_change(outcome: Result<EpochSummary, NetworkError>) {
    match outcome {
        Ok(summary) => println!(
            "Routing epoch {} published: {} unreachable pairs, computed in {:?}",
            summary.epoch, summary.unreachable_pairs, summary.computed_in
        ),
        Err(NetworkError::Topology(e)) if e.is_noop() => {
            crate::component_warn!("menu", "Link change ignored: {}", e);
            println!("Nothing changed: {}", e)
        }
        Err(e) => {
            crate::component_warn!("menu", "Link change failed: {}", e);
            println!("Change failed: {}", e)
        }
    }
}

/// Print every exchange and dead letter of a discovery round
pub fn print_discovery(outcome: Result<DiscoveryReport, NetworkError>) {
    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            crate::component_warn!("menu", "Discovery round failed: {}", e);
            println!("Discovery failed: {}", e);
            return;
        }
    };
    for exchange in &report.exchanges {
        println!("  {}", exchange);
    }
    for letter in &report.dead_letters {
        println!("  undeliverable: {}", letter);
    }
    println!(
        "{} of {} probes acknowledged",
        report.acknowledged, report.expected
    );
}

/// Print one routing table
pub fn print_table(table: &RoutingTable) {
    println!("Routing table of {}:", table.owner());
    for (destination, route) in table.routes() {
        if destination == table.owner() {
            continue;
        }
        println!(
            "  {:>5} via {:>5}  cost {:>4}  {} hops",
            destination.to_string(),
            route.next_hop.to_string(),
            route.cost,
            route.hop_count
        );
    }
}
