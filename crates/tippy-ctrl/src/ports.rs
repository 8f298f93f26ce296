//! Detection of local TCP ports that are already listening.

use std::collections::BTreeSet;
use std::io;
use std::net::TcpListener;

use tracing::debug;

/// Log target for port auditing.
const PORTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::ports");

/// TCP socket state for LISTEN in `/proc/net/tcp`.
#[cfg(target_os = "linux")]
const LISTEN_STATE: &str = "0A";

/// Source of listening-port information.
pub trait PortProbe: Send + Sync {
    /// Ports among `candidates` that something is listening on.
    ///
    /// Implementations may include ports outside `candidates`; callers
    /// intersect. Failures to query the OS yield an empty set.
    fn busy_ports(&self, candidates: &[u16]) -> BTreeSet<u16>;
}

/// Probe backed by the operating system.
///
/// On Linux the kernel's TCP tables are read. Elsewhere, or when the tables
/// are unreadable, each candidate is tried with a loopback bind.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPortProbe;

impl PortProbe for SystemPortProbe {
    fn busy_ports(&self, candidates: &[u16]) -> BTreeSet<u16> {
        #[cfg(target_os = "linux")]
        if let Some(listening) = read_proc_listeners() {
            return listening;
        }
        busy_among(candidates)
    }
}

#[cfg(target_os = "linux")]
fn read_proc_listeners() -> Option<BTreeSet<u16>> {
    let mut any_read = false;
    let mut ports = BTreeSet::new();
    for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
        match std::fs::read_to_string(table) {
            Ok(contents) => {
                any_read = true;
                ports.extend(parse_proc_table(&contents));
            }
            Err(error) => {
                debug!(target: PORTS_TARGET, table, %error, "could not read TCP table");
            }
        }
    }
    any_read.then_some(ports)
}

/// Extracts listening local ports from a `/proc/net/tcp`-style table.
#[cfg(target_os = "linux")]
fn parse_proc_table(contents: &str) -> impl Iterator<Item = u16> + '_ {
    contents.lines().skip(1).filter_map(|row| {
        let mut columns = row.split_whitespace();
        let local = columns.nth(1)?;
        let state = columns.nth(1)?;
        if state != LISTEN_STATE {
            return None;
        }
        let (_, port) = local.rsplit_once(':')?;
        u16::from_str_radix(port, 16).ok()
    })
}

/// Candidates that cannot be bound on loopback because they are in use.
fn busy_among(candidates: &[u16]) -> BTreeSet<u16> {
    candidates
        .iter()
        .copied()
        .filter(|&port| match TcpListener::bind(("127.0.0.1", port)) {
            Ok(_) => false,
            Err(error) if error.kind() == io::ErrorKind::AddrInUse => true,
            Err(error) => {
                debug!(target: PORTS_TARGET, port, %error, "bind probe failed");
                false
            }
        })
        .collect()
}

/// Reports which of a project's ports are already taken.
pub struct PortAuditor {
    probe: Box<dyn PortProbe>,
}

impl PortAuditor {
    /// Creates an auditor over `probe`.
    #[must_use]
    pub fn new(probe: Box<dyn PortProbe>) -> Self {
        Self { probe }
    }

    /// Auditor using [`SystemPortProbe`].
    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(SystemPortProbe))
    }

    /// Candidates that are in use, in candidate order without duplicates.
    #[must_use]
    pub fn ports_in_use(&self, candidates: &[u16]) -> Vec<u16> {
        let busy = self.probe.busy_ports(candidates);
        let mut seen = BTreeSet::new();
        let in_use: Vec<u16> = candidates
            .iter()
            .copied()
            .filter(|port| busy.contains(port) && seen.insert(*port))
            .collect();
        debug!(target: PORTS_TARGET, ?candidates, ?in_use, "audited ports");
        in_use
    }
}

impl Default for PortAuditor {
    fn default() -> Self {
        Self::system()
    }
}
