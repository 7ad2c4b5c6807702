//! Router graph, link mutation and link-state shortest path computation for linkstate.
//!
//! This crate owns the network topology: an arena of router nodes with
//! weighted bidirectional links, the single-source shortest path engine used
//! to derive next-hop tables, and a seedable random topology generator.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod generate;
pub mod graph;
pub mod link_state;

pub use error::TopologyError;
pub use generate::{RandomTopology, MIN_DEGREE_FLOOR};
pub use graph::{validate_weight, Edge, LinkInfo, Node, NodeId, Topology};
pub use link_state::*;
