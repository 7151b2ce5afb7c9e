// src/pipeline/scheduler.rs

//! Repeating timer around [`PollCycle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::pipeline::poll::{CycleReport, PollCycle};

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs a poll cycle on a fixed interval until stopped.
///
/// The first cycle starts immediately. A cycle that overruns the interval
/// causes the missed ticks to be skipped, never queued.
pub struct Scheduler {
    cycle: Arc<PollCycle>,
    interval: Duration,
    running: Option<Running>,
}

impl Scheduler {
    pub fn new(cycle: Arc<PollCycle>, interval: Duration) -> Self {
        Self {
            cycle,
            interval,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Spawn the timer loop. Fails if it is already running.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(AppError::validation("scheduler already running"));
        }
        if self.interval.is_zero() {
            return Err(AppError::config("poll interval must be positive"));
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let cycle = Arc::clone(&self.cycle);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tick.tick() => {
                        // An in-flight cycle always runs to completion.
                        if let Err(e) = cycle.run_once().await {
                            log::error!("Poll cycle failed: {e}");
                        }
                    }
                }
            }
            log::info!("Scheduler stopped");
        });

        log::info!("Scheduler started, polling every {}s", period.as_secs_f32());
        self.running = Some(Running { cancel, handle });
        Ok(())
    }

    /// Stop the loop, waiting for an in-flight cycle to finish.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                log::error!("Scheduler task ended abnormally: {e}");
            }
        }
    }

    /// Run one cycle now, independent of the timer.
    pub async fn run_once(&self) -> Result<CycleReport> {
        self.cycle.run_once().await
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}
