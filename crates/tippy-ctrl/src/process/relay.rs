//! Threads that copy a child's output into the log stream.

use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tippy_config::ProcessKind;
use tracing::debug;

use super::PROCESS_TARGET;
use crate::log::{LogHub, LogLine, LogSource};

/// Spawns a thread publishing each line of `reader` until EOF.
///
/// Lines that are not valid UTF-8 are converted lossily. The thread never
/// blocks on subscribers, so the pipe is drained continuously.
pub(super) fn spawn_relay<R>(
    kind: ProcessKind,
    stream: &'static str,
    reader: R,
    hub: Arc<LogHub>,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("tippy-{kind}-{stream}"))
        .spawn(move || relay_lines(kind, stream, reader, &hub))
}

fn relay_lines<R: Read>(kind: ProcessKind, stream: &'static str, reader: R, hub: &LogHub) {
    let source = LogSource::from(kind);
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buffer);
                hub.publish(LogLine::new(source, text.trim_end_matches(['\n', '\r'])));
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => {
                debug!(target: PROCESS_TARGET, %kind, stream, %error, "log relay read failed");
                break;
            }
        }
    }
    debug!(target: PROCESS_TARGET, %kind, stream, "log relay finished");
}
