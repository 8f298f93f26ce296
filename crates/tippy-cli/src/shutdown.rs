//! Termination signal handling for long-running commands.

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::info;

use crate::AppError;

const SHUTDOWN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shutdown");

/// Non-blocking listener for termination signals.
///
/// While it is alive the default action of the registered signals is
/// suppressed, so the process keeps running until it stops its children.
pub(crate) struct ShutdownSignal {
    signals: Signals,
    received: bool,
}

impl ShutdownSignal {
    pub(crate) fn install() -> Result<Self, AppError> {
        let signals =
            Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP]).map_err(AppError::Signals)?;
        Ok(Self {
            signals,
            received: false,
        })
    }

    /// Whether a termination signal has arrived since installation.
    pub(crate) fn requested(&mut self) -> bool {
        if !self.received
            && let Some(signal) = self.signals.pending().next()
        {
            info!(target: SHUTDOWN_TARGET, signal, "shutdown signal received");
            self.received = true;
        }
        self.received
    }
}
