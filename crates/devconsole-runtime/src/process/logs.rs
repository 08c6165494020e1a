//! Dev-server log buffering and fan-out.
//!
//! The hub appends every line to a bounded ring buffer and pushes it into
//! one bounded queue per observer. Appending, sequencing and fan-out happen
//! under a single lock, so every observer sees the same order and a
//! subscribe call splits the stream cleanly into backlog and live lines.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use devconsole_core::ports::LogSinkPort;
use devconsole_core::{LogLine, LogOrigin};
use tokio::sync::{Semaphore, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Default number of lines kept for late-joining observers.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Default per-observer queue depth before the observer is detached.
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 256;

/// Ring buffer storing the most recent log lines.
#[derive(Debug)]
pub struct LogBuffer {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl LogBuffer {
    /// Create an empty buffer holding at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
        }
    }

    /// Add a line, evicting the oldest ones if at capacity.
    pub fn push(&mut self, line: LogLine) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// All buffered lines, oldest first.
    pub fn get_all(&self) -> Vec<LogLine> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Opaque handle identifying one attached observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of attaching to the hub.
///
/// `backlog` holds every line buffered at attach time; `receiver` yields
/// exactly the lines appended afterwards. The receiver ends when the
/// observer is detached (unsubscribed, or dropped for falling behind).
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub backlog: Vec<LogLine>,
    pub receiver: mpsc::Receiver<LogLine>,
}

struct HubState {
    buffer: LogBuffer,
    subscribers: HashMap<SubscriberId, mpsc::Sender<LogLine>>,
    next_seq: u64,
    next_subscriber: u64,
}

/// Backlog buffer plus real-time broadcast of dev-server output.
///
/// Outlives any number of process start/stop cycles.
pub struct LogHub {
    state: Mutex<HubState>,
    queue_capacity: usize,
}

impl LogHub {
    /// Create a hub keeping `capacity` lines of backlog and allowing each
    /// observer to fall `queue_capacity` lines behind before it is detached.
    pub fn new(capacity: usize, queue_capacity: usize) -> Self {
        Self {
            state: Mutex::new(HubState {
                buffer: LogBuffer::new(capacity),
                subscribers: HashMap::new(),
                next_seq: 0,
                next_subscriber: 0,
            }),
            queue_capacity: queue_capacity.clamp(1, Semaphore::MAX_PERMITS),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY, DEFAULT_SUBSCRIBER_QUEUE)
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a line and deliver it to every attached observer.
    ///
    /// Never waits on an observer: one whose queue is full or whose receiver
    /// has been dropped is detached on the spot. Returns the assigned
    /// sequence number.
    pub fn publish(&self, origin: LogOrigin, content: impl Into<String>) -> u64 {
        let mut guard = self.state();
        let state = &mut *guard;

        state.next_seq += 1;
        let line = LogLine::new(state.next_seq, origin, content);
        state.buffer.push(line.clone());

        state
            .subscribers
            .retain(|id, sender| match sender.try_send(line.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber_id = %id, "Console observer fell behind, detaching");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber_id = %id, "Console observer went away, detaching");
                    false
                }
            });

        line.seq
    }

    /// Attach a new observer.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let mut state = self.state();

        state.next_subscriber += 1;
        let id = SubscriberId(state.next_subscriber);
        let backlog = state.buffer.get_all();
        state.subscribers.insert(id, sender);

        debug!(subscriber_id = %id, backlog = backlog.len(), "Console observer attached");
        Subscription {
            id,
            backlog,
            receiver,
        }
    }

    /// Detach an observer. Unknown or already-detached ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.state().subscribers.remove(&id).is_some() {
            debug!(subscriber_id = %id, "Console observer detached");
        }
    }

    /// Detach every observer, ending their live streams.
    ///
    /// The backlog is kept.
    pub fn close_subscribers(&self) {
        let mut state = self.state();
        let count = state.subscribers.len();
        state.subscribers.clear();
        debug!(count, "Closed all console observers");
    }

    /// Copy of the buffered lines, oldest first.
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.state().buffer.get_all()
    }

    pub fn len(&self) -> usize {
        self.state().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state().buffer.capacity()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }
}

impl Default for LogHub {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl LogSinkPort for LogHub {
    fn append(&self, origin: LogOrigin, line: String) {
        self.publish(origin, line);
    }
}
