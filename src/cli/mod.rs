//! Command-line interface
//!
//! Argument parsing, command handlers, and terminal rendering.

pub mod args;
pub mod commands;
pub mod render;
pub mod session;
