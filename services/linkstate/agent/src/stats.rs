//! Per-agent forwarding statistics

use serde::Serialize;
use std::ops::AddAssign;
use std::sync::atomic::{AtomicU64, Ordering};

/// Forwarding counters of one agent, shared with the network handle
#[derive(Debug, Default)]
pub struct ForwardingStats {
    forwarded: AtomicU64,
    delivered: AtomicU64,
    acknowledged: AtomicU64,
    dead_letters: AtomicU64,
    topology_changes: AtomicU64,
}

impl ForwardingStats {
    pub(crate) fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_acknowledged(&self) {
        self.acknowledged.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dead_letter(&self) {
        self.dead_letters.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_topology_change(&self) {
        self.topology_changes.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
            dead_letters: self.dead_letters.load(Ordering::Relaxed),
            topology_changes: self.topology_changes.load(Ordering::Relaxed),
        }
    }
}

/// Copy of forwarding counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Messages passed on to a next hop
    pub forwarded: u64,
    /// Discovery requests that reached their target
    pub delivered: u64,
    /// Acknowledgements that reached the probe origin
    pub acknowledged: u64,
    /// Messages dropped for lack of a route
    pub dead_letters: u64,
    /// Link changes handled, no-ops included
    pub topology_changes: u64,
}

impl AddAssign for StatsSnapshot {
    fn add_assign(&mut self, other: Self) {
        self.forwarded += other.forwarded;
        self.delivered += other.delivered;
        self.acknowledged += other.acknowledged;
        self.dead_letters += other.dead_letters;
        self.topology_changes += other.topology_changes;
    }
}
