use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::reload::{ReloadCycle, ReloadReport};

/// Runs a reload cycle once at startup and then every `interval` until shut down.
///
/// A zero interval means the startup reload is the only one.
pub struct RefreshScheduler<R> {
    reloader: Arc<R>,
    interval: Duration,
    fail_on_initial_error: bool,
}

impl<R: ReloadCycle> RefreshScheduler<R> {
    pub fn new(reloader: Arc<R>, interval: Duration) -> Self {
        Self {
            reloader,
            interval,
            fail_on_initial_error: true,
        }
    }

    /// Whether [`start`](Self::start) fails when the startup reload does. Defaults to `true`.
    pub fn with_fail_on_initial_error(mut self, fail: bool) -> Self {
        self.fail_on_initial_error = fail;
        self
    }

    /// Reload once, then spawn the periodic loop.
    ///
    /// The startup reload runs to completion before this returns. Must be called
    /// from within a tokio runtime.
    pub async fn start(self) -> anyhow::Result<SchedulerHandle> {
        let initial = self.reloader.reload().await;

        let initial = match initial {
            Ok(report) => Ok(report),
            Err(e) if self.fail_on_initial_error => return Err(e.context("initial reload failed")),
            Err(e) => {
                error!("initial reload failed, continuing with what was loaded: {:#}", e);
                Err(e)
            }
        };

        let token = CancellationToken::new();
        let cycles = Arc::new(AtomicU64::new(0));

        let task = if self.interval.is_zero() {
            info!("reload interval is zero, hosts lists will not be refreshed");
            None
        } else {
            info!("refreshing hosts lists every {:?}", self.interval);
            Some(tokio::spawn(run(
                self.reloader,
                self.interval,
                token.clone(),
                cycles.clone(),
            )))
        };

        Ok(SchedulerHandle {
            token,
            task,
            cycles,
            initial,
        })
    }
}

async fn run<R: ReloadCycle>(reloader: Arc<R>, interval: Duration, token: CancellationToken, cycles: Arc<AtomicU64>) {
    let mut tick = time::interval(interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tick.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tick.tick() => {}
        }

        // Outside the select: shutdown never interrupts a running reload.
        match reloader.reload().await {
            Ok(report) => debug!("periodic reload merged {} new names", report.added()),
            Err(e) => error!("periodic reload failed: {:#}", e),
        }
        cycles.fetch_add(1, Ordering::Relaxed);
    }

    info!("refresh scheduler stopped");
}

/// Controls a started [`RefreshScheduler`]. Dropping the handle stops the loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    cycles: Arc<AtomicU64>,
    initial: anyhow::Result<ReloadReport>,
}

impl SchedulerHandle {
    /// Stop the loop before its next tick. A reload in progress still completes.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Wait for the loop to exit. Returns immediately when no loop was spawned.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("refresh scheduler task failed: {}", e);
            }
        }
    }

    /// Completed periodic cycles, successful or not. The startup reload is not counted.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Outcome of the startup reload.
    pub fn initial(&self) -> Result<&ReloadReport, &anyhow::Error> {
        self.initial.as_ref()
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
