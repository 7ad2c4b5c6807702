//! Next-hop routing tables, parallel table computation and epoch publication for linkstate.
//!
//! This crate turns a topology snapshot into one routing table per router.
//! The [`Coordinator`] fans the per-router shortest path jobs out over a fixed
//! worker pool and waits for every job before the new set of tables is
//! published through the [`RouteStore`] as a single epoch.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod epoch;
pub mod error;
pub mod router;
pub mod table;

pub use coordinator::*;
pub use epoch::*;
pub use error::RoutingError;
pub use router::*;
pub use table::*;
