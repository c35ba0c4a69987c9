//! Configuration module
//!
//! Loads and validates the controller's timing configuration. Without a
//! configuration file the literal 2000 ms / 3000 ms constants apply.

pub mod loader;
pub mod schema;

pub use loader::{load_timing, resolve_timing};
pub use schema::TimingConfig;
