//! Termination of child processes with a grace period.
//!
//! Children are spawned as leaders of their own process group, so signals
//! reach every descendant that has not moved to another group.

use std::io;
use std::process::Child;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tippy_config::ProcessKind;
use tracing::{debug, warn};

use super::PROCESS_TARGET;
use crate::error::ProcessError;

/// Interval between exit checks while waiting out the grace period.
const EXIT_POLL: Duration = Duration::from_millis(25);

/// Point in time `budget` from now, or `None` when that is unrepresentable.
fn deadline_after(budget: Duration) -> Option<Instant> {
    Instant::now().checked_add(budget)
}

fn before(deadline: Option<Instant>) -> bool {
    deadline.is_none_or(|limit| Instant::now() < limit)
}

/// Sends `signal` to the process group led by `pid`.
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let raw = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: `kill(2)` is memory-safe even when the group is gone; the
    // kernel simply returns an error.
    let result = unsafe { libc::kill(-raw, signal) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn request_termination(pid: u32) -> io::Result<()> {
    signal_group(pid, libc::SIGTERM)
}

#[cfg(not(unix))]
fn request_termination(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "graceful termination requires unix signals",
    ))
}

/// Sends SIGKILL to whatever is left of the group. A vanished group is fine.
#[cfg(unix)]
fn kill_group(pid: u32, kind: ProcessKind) {
    if let Err(error) = signal_group(pid, libc::SIGKILL)
        && error.raw_os_error() != Some(libc::ESRCH)
    {
        debug!(target: PROCESS_TARGET, %kind, pid, %error, "failed to kill process group");
    }
}

#[cfg(not(unix))]
const fn kill_group(_pid: u32, _kind: ProcessKind) {}

/// Waits until `child` exits or `grace` elapses. Returns whether it exited.
fn wait_for_exit(child: &mut Child, kind: ProcessKind, grace: Duration) -> bool {
    let deadline = deadline_after(grace);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: PROCESS_TARGET, %kind, ?status, "process exited");
                return true;
            }
            Ok(None) if before(deadline) => thread::sleep(EXIT_POLL),
            Ok(None) => return false,
            Err(error) => {
                warn!(target: PROCESS_TARGET, %kind, %error, "failed to check process status");
                return false;
            }
        }
    }
}

/// Stops `child`: SIGTERM to its group, up to `grace` to exit, then SIGKILL
/// to the group, then reap.
pub(super) fn terminate_child(
    child: &mut Child,
    kind: ProcessKind,
    grace: Duration,
) -> Result<(), ProcessError> {
    let pid = child.id();
    if let Ok(Some(status)) = child.try_wait() {
        debug!(target: PROCESS_TARGET, %kind, pid, ?status, "process had already exited");
        return Ok(());
    }

    match request_termination(pid) {
        Ok(()) => {
            if wait_for_exit(child, kind, grace) {
                return Ok(());
            }
            warn!(
                target: PROCESS_TARGET,
                %kind,
                pid,
                grace_ms = grace.as_millis(),
                "process ignored SIGTERM, killing"
            );
        }
        Err(error) => {
            debug!(target: PROCESS_TARGET, %kind, pid, %error, "SIGTERM not delivered, killing");
        }
    }

    kill_group(pid, kind);
    let terminate = |source: io::Error| ProcessError::Terminate { kind, pid, source };
    if let Err(error) = child.kill() {
        // The child may have exited between the last check and the kill.
        if error.kind() != io::ErrorKind::InvalidInput {
            return Err(terminate(error));
        }
    }
    child.wait().map(|_| ()).map_err(terminate)
}

/// Joins relay threads once the child `pid` has been reaped.
///
/// A descendant can keep a pipe open after the child is gone. Relays still
/// reading after `budget` trigger a SIGKILL to the rest of the group. Any
/// relay still running after a second `budget` is detached and ends on its
/// own at EOF.
pub(super) fn join_relays(
    relays: Vec<JoinHandle<()>>,
    pid: u32,
    kind: ProcessKind,
    budget: Duration,
) {
    if !await_relays(&relays, budget) {
        debug!(target: PROCESS_TARGET, %kind, pid, "descendants hold output pipes, killing group");
        kill_group(pid, kind);
        await_relays(&relays, budget);
    }
    for relay in relays {
        if !relay.is_finished() {
            warn!(target: PROCESS_TARGET, %kind, pid, "output pipe still held open, detaching log relay");
            continue;
        }
        if relay.join().is_err() {
            warn!(target: PROCESS_TARGET, %kind, "log relay panicked");
        }
    }
}

/// Waits up to `budget` for every relay to finish. Returns whether they did.
fn await_relays(relays: &[JoinHandle<()>], budget: Duration) -> bool {
    let deadline = deadline_after(budget);
    loop {
        if relays.iter().all(JoinHandle::is_finished) {
            return true;
        }
        if !before(deadline) {
            return false;
        }
        thread::sleep(EXIT_POLL);
    }
}
