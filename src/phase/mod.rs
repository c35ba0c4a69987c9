//! Phase controller
//!
//! Implements the traffic light state machine: a guarded, timed, two-stage
//! transition sequence over three lamps.
//!
//! # Architecture
//!
//! - [`LampSet`] — Snapshot of the red, yellow and green lamps
//! - [`GuardClock`] — Elapsed-time debounce for advance requests
//! - [`Scheduler`] — Port for the deferred second half of each sequence
//! - [`PhaseController`] — Owns the state; accepts requests, emits [`LampChange`]s

pub mod controller;
pub mod guard;
pub mod lamp;
pub mod scheduler;

pub use controller::{ChangeCause, LampChange, PhaseController};
pub use guard::GuardClock;
pub use lamp::{LampColor, LampSet, LampState, Stage};
pub use scheduler::{ScheduledTask, Scheduler, Task, TokioScheduler};
