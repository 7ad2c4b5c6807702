//! Router agents, mailboxes, discovery exchanges and topology changes for linkstate.
//!
//! Every router runs as its own task with a bounded mailbox. Agents forward
//! discovery requests and acknowledgements hop by hop using the routing
//! tables of the current epoch, and hand link changes to a single
//! [`ChangeHandler`] that recomputes and republishes every table.
//!
//! ## Example
//!
//! ```rust,no_run
//! use linkstate_agent::{Network, NetworkConfig};
//! use linkstate_topology::{LinkInfo, NodeId, Topology};
//!
//! # async fn example() -> Result<(), linkstate_agent::NetworkError> {
//! let mut topology = Topology::new(3);
//! topology.add_link(NodeId(0), NodeId(1), 2)?;
//! topology.add_link(NodeId(1), NodeId(2), 2)?;
//!
//! let network = Network::launch(topology, NetworkConfig::default()).await?;
//! let report = network.probe(NodeId(0), NodeId(2)).await?;
//! println!("{}", report.exchanges[0]);
//!
//! network.remove_link(LinkInfo::new(NodeId(1), NodeId(2))).await?;
//! let stats = network.shutdown().await?;
//! println!("{:?}", stats);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod agent;
pub mod change;
pub mod discovery;
pub mod error;
pub mod inflight;
pub mod message;
pub mod network;
pub mod stats;

pub use change::ChangeHandler;
pub use discovery::{format_route, random_pairs, DeadLetter, DiscoveryReport, DiscoveryRound, Exchange};
pub use error::NetworkError;
pub use inflight::{InFlight, InFlightGuard};
pub use message::{ChangeResult, Message, MessageKind, Probe};
pub use network::{Network, NetworkConfig};
pub use stats::{ForwardingStats, StatsSnapshot};
