//! Validation loop scheduler.
//!
//! Iterations start a fixed interval apart, measured start to start. An
//! iteration that overruns the interval is followed immediately by the next.
//! Stopping is cooperative: it is observed before each iteration, after
//! each iteration and during the wait between them, but never interrupts an
//! iteration already running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::types::Result;
use crate::validator::{IterationReport, Validator};

/// Anything the scheduler can drive.
#[async_trait]
pub trait IterationRunner: Send + Sync {
    async fn run_iteration(&self) -> Result<IterationReport>;
}

#[async_trait]
impl IterationRunner for Validator {
    async fn run_iteration(&self) -> Result<IterationReport> {
        Validator::run_iteration(self).await
    }
}

/// Lifecycle of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopping,
    Stopped,
}

/// Requests a cooperative stop. Cloneable across tasks and signal handlers.
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
    state: Arc<RwLock<SchedulerState>>,
}

impl StopHandle {
    pub fn stop(&self) {
        if let Ok(mut state) = self.state.write() {
            if *state == SchedulerState::Running {
                *state = SchedulerState::Stopping;
            }
        }
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

pub struct Scheduler {
    runner: Arc<dyn IterationRunner>,
    interval: Duration,
    stop_tx: Arc<watch::Sender<bool>>,
    state: Arc<RwLock<SchedulerState>>,
    iterations: AtomicU64,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn IterationRunner>, interval: Duration) -> Self {
        let (stop_tx, _) = watch::channel(false);

        Self {
            runner,
            interval,
            stop_tx: Arc::new(stop_tx),
            state: Arc::new(RwLock::new(SchedulerState::Stopped)),
            iterations: AtomicU64::new(0),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
            state: self.state.clone(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
            .read()
            .map(|s| *s)
            .unwrap_or(SchedulerState::Stopped)
    }

    /// Iterations run so far, failed ones included.
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::SeqCst)
    }

    fn set_state(&self, next: SchedulerState) {
        if let Ok(mut state) = self.state.write() {
            *state = next;
        }
    }

    /// Drive iterations until a stop is requested.
    pub async fn run(&self) {
        let mut stop_rx = self.stop_tx.subscribe();
        self.set_state(SchedulerState::Running);
        info!(interval_secs = self.interval.as_secs(), "Validation loop started");

        loop {
            if *stop_rx.borrow_and_update() {
                break;
            }

            let started = Instant::now();
            let iteration = self.iterations.fetch_add(1, Ordering::SeqCst) + 1;

            match self.runner.run_iteration().await {
                Ok(report) => debug!(iteration, id = %report.iteration_id, "Iteration succeeded"),
                Err(e) => error!(iteration, error = %e, "Iteration failed"),
            }

            if *stop_rx.borrow_and_update() {
                break;
            }

            let wait = self.interval.saturating_sub(started.elapsed());
            if wait.is_zero() {
                warn!(
                    iteration,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Iteration overran interval, starting next immediately"
                );
                continue;
            }

            info!(sleep_secs = wait.as_secs_f64(), "Sleeping until next iteration");
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = stop_rx.changed() => {}
            }
        }

        self.set_state(SchedulerState::Stopping);
        info!(iterations = self.iterations(), "Terminating validation loop");
        self.set_state(SchedulerState::Stopped);
    }
}
