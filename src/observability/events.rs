//! Structured event stream.
//!
//! Discrete, typed events describing a controller run. Events are
//! serialized as newline-delimited JSON (JSONL) with a monotonically
//! increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::schema::TimingConfig;
use crate::phase::{ChangeCause, LampChange, LampState, Stage};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a controller run.
///
/// Each variant is tagged with `"type"` when serialized to JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The controller was created at stable red.
    ControllerStarted {
        /// When the controller started.
        timestamp: DateTime<Utc>,
        /// Guard threshold at stable green, in milliseconds.
        green_guard_ms: u64,
        /// Guard threshold at stable red, in milliseconds.
        red_guard_ms: u64,
        /// Deferred delay of the red-to-green half, in milliseconds.
        red_to_green_delay_ms: u64,
        /// Deferred delay of the green-to-red half, in milliseconds.
        green_to_red_delay_ms: u64,
    },

    /// An advance request was made.
    AdvanceRequested {
        /// When the request was made.
        timestamp: DateTime<Utc>,
        /// Whether the guard clock accepted it.
        accepted: bool,
        /// Scheduled offset from the start of a simulation, if scripted.
        #[serde(skip_serializing_if = "Option::is_none")]
        offset_ms: Option<u64>,
    },

    /// The lamps changed.
    LampsChanged {
        /// When the change was observed.
        timestamp: DateTime<Utc>,
        /// Controller-assigned change sequence.
        change: u64,
        /// Red lamp state.
        red: LampState,
        /// Yellow lamp state.
        yellow: LampState,
        /// Green lamp state.
        green: LampState,
        /// Stage of the new configuration, absent when outside the cycle.
        stage: Option<Stage>,
        /// Which half of the sequence produced the change.
        cause: ChangeCause,
    },

    /// The subscriber fell behind and lost notifications.
    ChangesDropped {
        /// When the gap was noticed.
        timestamp: DateTime<Utc>,
        /// Number of notifications skipped.
        skipped: u64,
    },

    /// The controller run ended.
    ControllerStopped {
        /// When the run ended.
        timestamp: DateTime<Utc>,
        /// Human-readable stop reason.
        reason: String,
        /// Requests accepted during the run.
        accepted: u64,
        /// Requests ignored during the run.
        ignored: u64,
    },
}

impl Event {
    /// Builds a `ControllerStarted` event from the active timing.
    #[must_use]
    pub fn started(timing: &TimingConfig) -> Self {
        Self::ControllerStarted {
            timestamp: Utc::now(),
            green_guard_ms: millis(timing.green_guard),
            red_guard_ms: millis(timing.red_guard),
            red_to_green_delay_ms: millis(timing.red_to_green_delay),
            green_to_red_delay_ms: millis(timing.green_to_red_delay),
        }
    }

    /// Builds a `LampsChanged` event from a controller notification.
    #[must_use]
    pub fn lamps_changed(change: &LampChange) -> Self {
        Self::LampsChanged {
            timestamp: Utc::now(),
            change: change.sequence,
            red: change.lamps.red(),
            yellow: change.lamps.yellow(),
            green: change.lamps.green(),
            stage: change.lamps.stage(),
            cause: change.cause,
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
#[must_use]
pub fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) increments the sequence counter,
/// serializes the event as one JSON line and flushes. Serialization and I/O
/// failures are dropped: a broken output must not stop the light.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug — provide a manual impl.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
