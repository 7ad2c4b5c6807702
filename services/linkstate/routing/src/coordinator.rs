//! Parallel routing table computation.
//!
//! One shortest path job is queued per router, a fixed pool of worker
//! threads drains the queue, and the coordinator counts completions until
//! every job has reported back. Only then is the set of tables handed out.

use crate::epoch::{EpochSummary, RouteStore};
use crate::error::RoutingError;
use crate::table::RoutingTable;
use linkstate_topology::{shortest_paths, NodeId, Topology};
use std::num::NonZeroUsize;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Instant;
use tracing::{debug, trace};

/// Fan-out/fan-in coordinator for routing table computation
#[derive(Debug, Clone)]
pub struct Coordinator {
    /// Worker pool size
    workers: usize,
}

impl Coordinator {
    /// Create a coordinator with `workers` threads; 0 means available parallelism
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            workers
        };
        Self { workers }
    }

    /// Worker pool size
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Compute every router's table from `topology`, blocking the caller
    pub fn compute(&self, topology: &Topology) -> Result<Vec<RoutingTable>, RoutingError> {
        let expected = topology.node_count();
        let pool = self.workers.min(expected).max(1);

        let (job_tx, job_rx) = mpsc::channel::<NodeId>();
        for node in topology.node_ids() {
            job_tx
                .send(node)
                .map_err(|e| RoutingError::Worker(e.to_string()))?;
        }
        // Closing the queue lets idle workers exit once it is drained
        drop(job_tx);

        let jobs = Mutex::new(job_rx);
        let (done_tx, done_rx) = mpsc::channel::<RoutingTable>();

        thread::scope(|scope| {
            for worker in 0..pool {
                let jobs = &jobs;
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    let mut computed = 0usize;
                    loop {
                        let job = match jobs.lock() {
                            Ok(queue) => queue.recv(),
                            Err(_) => break,
                        };
                        let Ok(source) = job else { break };

                        let table = RoutingTable::from_paths(&shortest_paths(topology, source));
                        if done_tx.send(table).is_err() {
                            break;
                        }
                        computed += 1;
                    }
                    trace!("Route worker {} computed {} tables", worker, computed);
                });
            }
        });
        drop(done_tx);

        // Counting barrier: every queued job must have produced a table
        let mut slots: Vec<Option<RoutingTable>> = vec![None; expected];
        let mut completed = 0usize;
        for table in done_rx.iter() {
            if let Some(slot) = slots.get_mut(table.owner().index()) {
                *slot = Some(table);
                completed += 1;
            }
        }

        let incomplete = RoutingError::IncompleteEpoch {
            expected,
            completed,
        };
        if completed != expected {
            return Err(incomplete);
        }
        let tables: Vec<RoutingTable> = slots.into_iter().collect::<Option<_>>().ok_or(incomplete)?;

        debug!("Computed {} routing tables on {} workers", tables.len(), pool);
        Ok(tables)
    }

    /// Compute tables from a topology snapshot on the blocking pool
    pub async fn recompute(&self, topology: Arc<Topology>) -> Result<Vec<RoutingTable>, RoutingError> {
        let coordinator = self.clone();
        tokio::task::spawn_blocking(move || coordinator.compute(&topology))
            .await
            .map_err(|e| RoutingError::Worker(e.to_string()))?
    }

    /// Compute a new epoch and publish it to `store`
    pub async fn recompute_and_publish(
        &self,
        topology: Arc<Topology>,
        store: &RouteStore,
    ) -> Result<EpochSummary, RoutingError> {
        let started = Instant::now();
        let tables = self.recompute(topology).await?;
        Ok(store.publish(tables, started.elapsed()).await)
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(0)
    }
}
