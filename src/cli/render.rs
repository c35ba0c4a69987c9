//! Terminal rendering of controller output
//!
//! The renderer is a pure consumer: it reads lamp-change notifications and
//! run milestones and writes them to stdout (human lines or JSONL) and to
//! an optional event file. It never calls back into the controller.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cli::args::OutputFormat;
use crate::config::schema::TimingConfig;
use crate::observability::events::{Event, EventEmitter, millis};
use crate::phase::{LampChange, LampColor, LampSet, Stage};

/// Where rendered output goes: human lines on the console, events to
/// every emitter.
struct Outputs {
    console: Option<Box<dyn Write + Send>>,
    emitters: Vec<EventEmitter>,
}

impl Outputs {
    fn emit(&self, event: &Event) {
        for emitter in &self.emitters {
            emitter.emit(event.clone());
        }
    }

    fn say(&mut self, line: fmt::Arguments<'_>) {
        if let Some(console) = self.console.as_mut() {
            // A closed terminal must not stop the light.
            let _ = writeln!(console, "{line}");
            let _ = console.flush();
        }
    }
}

/// Writes run output in the selected format.
///
/// All output goes through one lock, so a press is always written before
/// the lamp changes it causes.
pub struct Renderer {
    outputs: Mutex<Outputs>,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outputs = self.lock();
        f.debug_struct("Renderer")
            .field("console", &outputs.console.is_some())
            .field("emitters", &outputs.emitters)
            .finish()
    }
}

impl Renderer {
    /// Creates a renderer for `format`, additionally writing the event
    /// stream to `events_path` when given. `quiet` drops the human lines;
    /// a requested JSON stream is still written.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the event file cannot be created.
    pub fn new(
        format: OutputFormat,
        events_path: Option<&Path>,
        quiet: bool,
    ) -> std::io::Result<Self> {
        let mut emitters = Vec::new();
        let mut console: Option<Box<dyn Write + Send>> = None;
        match format {
            OutputFormat::Json => emitters.push(EventEmitter::stdout()),
            OutputFormat::Human if !quiet => console = Some(Box::new(std::io::stdout())),
            OutputFormat::Human => {}
        }
        if let Some(path) = events_path {
            emitters.push(EventEmitter::from_file(path)?);
        }
        Ok(Self::with_outputs(console, emitters))
    }

    /// Creates a renderer writing human lines to `console`, if any, and
    /// events to the given emitters.
    #[must_use]
    pub fn with_outputs(
        console: Option<Box<dyn Write + Send>>,
        emitters: Vec<EventEmitter>,
    ) -> Self {
        Self {
            outputs: Mutex::new(Outputs { console, emitters }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Outputs> {
        self.outputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reports the controller's start.
    pub fn started(&self, timing: &TimingConfig) {
        let mut out = self.lock();
        out.emit(&Event::started(timing));
        out.say(format_args!(
            "{}  ready (guards {} / {}, delays {} / {})",
            format_lamps(&LampSet::STABLE_RED),
            humantime::format_duration(timing.green_guard),
            humantime::format_duration(timing.red_guard),
            humantime::format_duration(timing.red_to_green_delay),
            humantime::format_duration(timing.green_to_red_delay),
        ));
    }

    /// Runs `request` (one press of the button) and reports its outcome.
    ///
    /// The output lock is held across `request`, so the renderer task
    /// cannot write the resulting lamp change first.
    pub fn press(&self, offset: Option<Duration>, request: impl FnOnce() -> bool) -> bool {
        let mut out = self.lock();
        let accepted = request();
        out.emit(&Event::AdvanceRequested {
            timestamp: Utc::now(),
            accepted,
            offset_ms: offset.map(millis),
        });
        let at = offset.map_or_else(String::new, |o| {
            format!("[+{}] ", humantime::format_duration(o))
        });
        let outcome = if accepted {
            "accepted"
        } else {
            "ignored, too soon"
        };
        out.say(format_args!("{at}change: {outcome}"));
        accepted
    }

    /// Reports a lamp change.
    pub fn lamps(&self, change: &LampChange) {
        let mut out = self.lock();
        out.emit(&Event::lamps_changed(change));
        out.say(format_args!(
            "{}  {} ({})",
            format_lamps(&change.lamps),
            stage_label(change.lamps.stage()),
            change.cause.as_str()
        ));
    }

    /// Reports notifications lost because the renderer fell behind.
    pub fn dropped(&self, skipped: u64) {
        let mut out = self.lock();
        out.emit(&Event::ChangesDropped {
            timestamp: Utc::now(),
            skipped,
        });
        out.say(format_args!("... {skipped} lamp changes skipped"));
    }

    /// Reports the end of the run.
    pub fn stopped(&self, reason: &str, accepted: u64, ignored: u64) {
        let mut out = self.lock();
        out.emit(&Event::ControllerStopped {
            timestamp: Utc::now(),
            reason: reason.to_string(),
            accepted,
            ignored,
        });
        out.say(format_args!(
            "stopped: {reason} ({accepted} accepted, {ignored} ignored)"
        ));
    }
}

/// Renders the lamps top to bottom, e.g. `[R] [Y] [ ]`.
#[must_use]
pub fn format_lamps(lamps: &LampSet) -> String {
    LampColor::ALL
        .iter()
        .map(|color| {
            if lamps.get(*color).is_lit() {
                match color {
                    LampColor::Red => "[R]",
                    LampColor::Yellow => "[Y]",
                    LampColor::Green => "[G]",
                }
            } else {
                "[ ]"
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const fn stage_label(stage: Option<Stage>) -> &'static str {
    match stage {
        Some(Stage::StableRed) => "stop",
        Some(Stage::YellowRising) => "get ready",
        Some(Stage::StableGreen) => "go",
        Some(Stage::YellowFalling) => "clear",
        None => "overlapping transitions",
    }
}

/// Spawns the subscriber task that renders lamp changes until `cancel`
/// fires or the controller goes away.
///
/// Changes already queued when `cancel` fires are still rendered.
pub fn spawn_renderer(
    changes: broadcast::Receiver<LampChange>,
    renderer: Arc<Renderer>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut stream = BroadcastStream::new(changes);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                item = stream.next() => match item {
                    Some(Ok(change)) => renderer.lamps(&change),
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(skipped, "renderer fell behind the controller");
                        renderer.dropped(skipped);
                    }
                    None => break,
                },
                () = cancel.cancelled() => break,
            }
        }
    })
}
