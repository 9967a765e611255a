use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use serde::Serialize;
use sinkhole_hosts::BlackholeStore;

/// Global state shared across all requests.
pub struct Global {
    /// Names answered with a sinkhole address, kept current by the refresh scheduler.
    pub blackhole: Arc<BlackholeStore>,
    hits: AtomicU64,
}

/// Blocklist counters at one point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LiveStats {
    /// Queries answered with a sinkhole address since startup.
    pub hits: u64,
    /// Names currently in the blocklist.
    pub size: usize,
}

impl Global {
    pub fn new(blackhole: Arc<BlackholeStore>) -> Self {
        Self {
            blackhole,
            hits: AtomicU64::new(0),
        }
    }

    /// Count one sinkholed query and return the new total.
    pub fn record_hit(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn live_stats(&self) -> LiveStats {
        LiveStats {
            hits: self.hits.load(Ordering::Relaxed),
            size: self.blackhole.len(),
        }
    }
}
