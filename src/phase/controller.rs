//! Phase controller
//!
//! The `PhaseController` owns the three lamps, the phase flag and the guard
//! clock. An accepted advance request flips some lamps immediately and
//! schedules a deferred transition that flips the rest.
//!
//! State machine:
//!
//! ```text
//! StableRed --accepted--> YellowRising --red_to_green_delay--> StableGreen
//!     ^                                                            |
//!     +--green_to_red_delay-- YellowFalling <------accepted--------+
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::config::schema::TimingConfig;
use crate::observability::metrics;

use super::guard::GuardClock;
use super::lamp::{LampColor, LampSet, Stage};
use super::scheduler::{Scheduler, TokioScheduler};

/// Capacity of the lamp-change broadcast channel. A subscriber that falls
/// further behind than this skips the oldest notifications.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Which half of a two-stage sequence produced a lamp change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    /// Immediate half, applied while handling an accepted request.
    Request,
    /// Deferred half, applied when the scheduled transition fired.
    Deferred,
}

impl ChangeCause {
    /// Lowercase name, used for log fields and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Deferred => "deferred",
        }
    }
}

/// Notification delivered to subscribers after every lamp mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LampChange {
    /// Starts at 1 and increases by one per notification.
    pub sequence: u64,
    /// Lamp states after the change.
    pub lamps: LampSet,
    /// What produced the change.
    pub cause: ChangeCause,
}

/// One half of the red/green cycle.
#[derive(Debug, Clone, Copy)]
struct Sequence {
    immediate: &'static [LampColor],
    deferred: &'static [LampColor],
}

/// Stable red: light yellow now; later drop red and yellow, light green.
const RED_TO_GREEN: Sequence = Sequence {
    immediate: &[LampColor::Yellow],
    deferred: &[LampColor::Red, LampColor::Yellow, LampColor::Green],
};

/// Stable green: swap green for yellow now; later swap yellow for red.
const GREEN_TO_RED: Sequence = Sequence {
    immediate: &[LampColor::Green, LampColor::Yellow],
    deferred: &[LampColor::Yellow, LampColor::Red],
};

impl Sequence {
    const fn for_phase(phase: bool) -> Self {
        if phase { GREEN_TO_RED } else { RED_TO_GREEN }
    }
}

/// Mutable controller state; every access goes through one mutex so the
/// request handler and deferred callbacks never interleave.
#[derive(Debug)]
struct ControllerState {
    lamps: LampSet,
    /// `true`: next accepted request runs green to red.
    phase: bool,
    guard: GuardClock,
    sequence: u64,
}

struct Shared {
    timing: TimingConfig,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<ControllerState>,
    changes: broadcast::Sender<LampChange>,
    /// Number of deferred transitions scheduled but not yet fired.
    pending: watch::Sender<usize>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies toggles and notifies subscribers while the lock is held, so
    /// notification order matches mutation order.
    fn apply(&self, state: &mut ControllerState, toggles: &[LampColor], cause: ChangeCause) {
        for color in toggles {
            state.lamps.toggle(*color);
        }
        state.sequence += 1;

        let change = LampChange {
            sequence: state.sequence,
            lamps: state.lamps,
            cause,
        };
        metrics::record_lamp_change(&change);
        // No subscribers is fine; the change is still applied.
        let _ = self.changes.send(change);
    }

    fn fire_deferred(&self, toggles: &[LampColor]) {
        let mut state = self.lock();
        self.apply(&mut state, toggles, ChangeCause::Deferred);
        info!(lamps = %state.lamps, stage = ?state.lamps.stage(), "deferred transition fired");
        drop(state);

        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Traffic light phase controller.
///
/// Cloning yields another handle to the same controller.
///
/// Requests are accepted when
/// - no request has been accepted before, or
/// - at stable green (`phase == true`), more than `green_guard` has passed
///   since the last accepted request, or
/// - at stable red (`phase == false`), more than `red_guard` has passed.
///
/// Everything else is silently ignored. Scheduled transitions are never
/// cancelled, so a request accepted before the previous deferred transition
/// fired will overlap with it; with the default timing the guard and delay
/// of each half line up so this does not happen.
#[derive(Clone)]
pub struct PhaseController {
    shared: Arc<Shared>,
}

impl PhaseController {
    /// Creates a controller at stable red, scheduling deferred transitions
    /// on the ambient tokio runtime.
    #[must_use]
    pub fn new(timing: TimingConfig) -> Self {
        Self::with_scheduler(timing, Arc::new(TokioScheduler::new()))
    }

    /// Creates a controller at stable red using the given scheduler.
    #[must_use]
    pub fn with_scheduler(timing: TimingConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let (pending, _) = watch::channel(0);

        Self {
            shared: Arc::new(Shared {
                timing,
                scheduler,
                state: Mutex::new(ControllerState {
                    lamps: LampSet::STABLE_RED,
                    phase: false,
                    guard: GuardClock::new(),
                    sequence: 0,
                }),
                changes,
                pending,
            }),
        }
    }

    /// Requests the light to advance (the "Change" button).
    ///
    /// Returns `true` if the request was accepted, `false` if the guard
    /// clock rejected it. A rejected request changes nothing and schedules
    /// nothing.
    pub fn request_advance(&self) -> bool {
        let shared = &self.shared;
        let mut state = shared.lock();

        let phase = state.phase;
        let threshold = shared.timing.guard_for(phase);
        if !state.guard.admits(threshold) {
            debug!(
                phase,
                elapsed_ms = state.guard.elapsed().as_millis(),
                threshold_ms = threshold.as_millis(),
                "advance request ignored"
            );
            metrics::record_request(false);
            return false;
        }

        let sequence = Sequence::for_phase(phase);
        shared.apply(&mut state, sequence.immediate, ChangeCause::Request);
        state.phase = !phase;
        state.guard.restart();

        let delay = shared.timing.delay_for(phase);
        info!(
            lamps = %state.lamps,
            phase = state.phase,
            delay_ms = delay.as_millis(),
            "advance request accepted"
        );
        metrics::record_request(true);
        drop(state);

        shared.pending.send_modify(|n| *n += 1);
        let target = Arc::clone(shared);
        let task = shared.scheduler.schedule(
            delay,
            Box::new(move || target.fire_deferred(sequence.deferred)),
        );
        debug!(task_id = task.id(), "deferred transition scheduled");

        true
    }

    /// Current lamp states.
    #[must_use]
    pub fn lamps(&self) -> LampSet {
        self.shared.lock().lamps
    }

    /// Current phase flag: `true` when the next accepted request runs
    /// green to red.
    #[must_use]
    pub fn phase(&self) -> bool {
        self.shared.lock().phase
    }

    /// Stage of the current lamp configuration.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        self.lamps().stage()
    }

    /// Active timing configuration.
    #[must_use]
    pub fn timing(&self) -> TimingConfig {
        self.shared.timing
    }

    /// Number of deferred transitions scheduled but not yet fired.
    #[must_use]
    pub fn pending_transitions(&self) -> usize {
        *self.shared.pending.borrow()
    }

    /// Subscribes to lamp-change notifications emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LampChange> {
        self.shared.changes.subscribe()
    }

    /// Waits until every scheduled deferred transition has fired.
    pub async fn settled(&self) {
        let mut pending = self.shared.pending.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = pending.wait_for(|n| *n == 0).await;
    }
}

impl std::fmt::Debug for PhaseController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("PhaseController")
            .field("lamps", &state.lamps)
            .field("phase", &state.phase)
            .field("not_called_yet", &state.guard.not_called_yet())
            .finish_non_exhaustive()
    }
}
