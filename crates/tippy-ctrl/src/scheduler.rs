//! Timed production of a fixed number of blocks.
//!
//! A [`MiningScheduler`] owns one worker thread. The thread waits on a
//! cancellation channel with the tick interval as timeout: a timeout is a
//! tick, a message or a disconnected sender ends the run. The remaining
//! counter lives on the worker's stack and the thread exits when it reaches
//! zero, so ticks never overlap and no tick starts after cancellation.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tippy_rpc::ChainRpc;
use tracing::{debug, info};

use crate::error::SupervisorError;
use crate::guard::MiningOutcome;
use crate::log::LogHub;
use crate::reporter::LifecycleReporter;

const SCHEDULER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::scheduler");

/// Asks the node for one block and publishes the result on the control stream.
pub(crate) fn mine_block(
    rpc: &dyn ChainRpc,
    hub: &LogHub,
    reporter: &dyn LifecycleReporter,
) -> MiningOutcome {
    let outcome = match rpc.generate_block() {
        Ok(hash) => {
            reporter.block_mined(&hash);
            MiningOutcome::Mined(hash)
        }
        Err(error) => {
            let message = error.to_string();
            reporter.mining_failed(&message);
            MiningOutcome::Failed(message)
        }
    };
    hub.control(outcome.to_string());
    outcome
}

/// Sets the shared flag when the worker exits, including by panic.
struct FinishOnDrop(Arc<AtomicBool>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Handle to a running advanced-mining worker.
pub struct MiningScheduler {
    cancel: Sender<()>,
    finished: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MiningScheduler {
    /// Starts a worker that mines `block_count` blocks, one every `interval`.
    ///
    /// The first block is requested one interval after spawning. Tick failures
    /// are published and counted like successes.
    pub fn spawn(
        block_count: NonZeroU64,
        interval: Duration,
        rpc: Arc<dyn ChainRpc>,
        hub: Arc<LogHub>,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Result<Self, SupervisorError> {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let finished = Arc::new(AtomicBool::new(false));
        let finish_guard = FinishOnDrop(Arc::clone(&finished));
        let handle = thread::Builder::new()
            .name("tippy-mining-scheduler".to_owned())
            .spawn(move || {
                let _finish = finish_guard;
                let mut remaining = block_count.get();
                while remaining > 0 {
                    match cancelled.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            mine_block(rpc.as_ref(), &hub, reporter.as_ref());
                            remaining -= 1;
                            debug!(target: SCHEDULER_TARGET, remaining, "mining tick complete");
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            info!(target: SCHEDULER_TARGET, remaining, "advanced mining cancelled");
                            return;
                        }
                    }
                }
                info!(target: SCHEDULER_TARGET, "advanced mining finished");
                hub.control("Advanced mining finished");
            })
            .map_err(|source| SupervisorError::SchedulerSpawn { source })?;

        info!(
            target: SCHEDULER_TARGET,
            block_count = block_count.get(),
            interval_ms = interval.as_millis(),
            "advanced mining started"
        );
        Ok(Self {
            cancel,
            finished,
            handle: Some(handle),
        })
    }

    /// Whether the worker is still producing blocks.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.finished.load(Ordering::SeqCst)
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// Returns after any in-flight tick has completed; no further tick starts.
    pub fn cancel(mut self) -> Result<(), SupervisorError> {
        self.shutdown()
    }

    /// Waits for the worker to finish on its own.
    pub fn join(mut self) -> Result<(), SupervisorError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| SupervisorError::SchedulerPanicked),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self) -> Result<(), SupervisorError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        if self.cancel.send(()).is_err() {
            debug!(target: SCHEDULER_TARGET, "scheduler already exited");
        }
        handle.join().map_err(|_| SupervisorError::SchedulerPanicked)
    }
}

impl Drop for MiningScheduler {
    fn drop(&mut self) {
        if self.shutdown().is_err() {
            debug!(target: SCHEDULER_TARGET, "scheduler panicked before drop");
        }
    }
}
