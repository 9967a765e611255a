use std::time::{Duration, Instant};

/// Local state for a DNS request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    /// When the request was started
    pub time_started: Instant,
}

impl Local {
    pub fn time_elapsed(&self) -> Duration {
        self.time_started.elapsed()
    }
}

impl Default for Local {
    fn default() -> Self {
        Self {
            time_started: Instant::now(),
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod local_tests;
