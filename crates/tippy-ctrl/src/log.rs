//! Tagged log stream shared by all managed processes.
//!
//! Relay threads and the supervisor publish [`LogLine`]s into a [`LogHub`].
//! Every [`LogSubscription`] owns a bounded queue. Publishing never waits on
//! a subscriber: when a queue is full its oldest line is discarded and the
//! subscription's dropped counter grows. Subscriptions that have been dropped
//! are pruned on the next publish.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::time::{Duration, SystemTime};

use tippy_config::ProcessKind;

/// Origin of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogSource {
    /// Output of the node process.
    Node,
    /// Output of the miner process.
    Miner,
    /// Output of the indexer process.
    Indexer,
    /// Status lines emitted by the controller itself.
    Control,
}

impl LogSource {
    /// Lowercase tag used when rendering lines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Miner => "miner",
            Self::Indexer => "indexer",
            Self::Control => "control",
        }
    }
}

impl From<ProcessKind> for LogSource {
    fn from(kind: ProcessKind) -> Self {
        match kind {
            ProcessKind::Node => Self::Node,
            ProcessKind::Miner => Self::Miner,
            ProcessKind::Indexer => Self::Indexer,
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One line of output with its origin and capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Where the line came from.
    pub source: LogSource,
    /// Line text without its terminator.
    pub text: String,
    /// When the line was captured.
    pub captured_at: SystemTime,
}

impl LogLine {
    /// Captures `text` from `source` now.
    #[must_use]
    pub fn new(source: LogSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
            captured_at: SystemTime::now(),
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[{}] {}", self.source, self.text)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    lines: VecDeque<LogLine>,
    dropped: u64,
}

#[derive(Debug)]
struct SubscriberQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl SubscriberQueue {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn push(&self, line: LogLine) {
        let mut state = self.lock();
        if state.lines.len() >= self.capacity {
            state.lines.pop_front();
            state.dropped += 1;
        }
        state.lines.push_back(line);
        drop(state);
        self.ready.notify_one();
    }
}

/// Fan-out point for every log line in a project.
#[derive(Debug)]
pub struct LogHub {
    capacity: usize,
    subscribers: Mutex<Vec<Weak<SubscriberQueue>>>,
}

impl LogHub {
    /// Creates a hub whose subscribers buffer up to `capacity` lines each.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new subscriber. Only lines published afterwards are seen.
    pub fn subscribe(&self) -> LogSubscription {
        let queue = Arc::new(SubscriberQueue {
            capacity: self.capacity,
            state: Mutex::new(QueueState::default()),
            ready: Condvar::new(),
        });
        self.lock().push(Arc::downgrade(&queue));
        LogSubscription { queue }
    }

    /// Delivers `line` to every live subscriber.
    pub fn publish(&self, line: LogLine) {
        let mut subscribers = self.lock();
        subscribers.retain(|weak| weak.strong_count() > 0);
        for queue in subscribers.iter().filter_map(Weak::upgrade) {
            queue.push(line.clone());
        }
    }

    /// Publishes a controller status line.
    pub fn control(&self, text: impl Into<String>) {
        self.publish(LogLine::new(LogSource::Control, text));
    }

    /// Number of registered subscribers, counting ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Weak<SubscriberQueue>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Receiving end of the merged log stream.
#[derive(Debug)]
pub struct LogSubscription {
    queue: Arc<SubscriberQueue>,
}

impl LogSubscription {
    /// Takes the oldest buffered line, if any.
    pub fn try_recv(&self) -> Option<LogLine> {
        self.queue.lock().lines.pop_front()
    }

    /// Waits up to `timeout` for a line.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LogLine> {
        let guard = self.queue.lock();
        let (mut state, _) = self
            .queue
            .ready
            .wait_timeout_while(guard, timeout, |pending| pending.lines.is_empty())
            .unwrap_or_else(|poison| poison.into_inner());
        state.lines.pop_front()
    }

    /// Takes every buffered line.
    pub fn drain(&self) -> Vec<LogLine> {
        self.queue.lock().lines.drain(..).collect()
    }

    /// Lines discarded because this subscriber fell behind.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.queue.lock().dropped
    }
}
