//! `traffic-light` - timed traffic light phase controller
//!
//! A three-lamp light that walks stable red and stable green through a
//! yellow stage. Requests to advance are guarded by a minimum dwell time;
//! each accepted request changes the lamps at once and schedules the rest
//! of the transition after a fixed delay.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phase;
