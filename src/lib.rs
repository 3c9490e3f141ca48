//! Brings network interfaces and groups up and down by running hook executables
//! described in an indentation-structured interfaces file.

/// Command-line parsing and the action handlers.
pub mod cli;
/// Default paths and fixed names.
pub mod constants;
pub mod core;
/// The configuration model shared by every layer.
pub mod models;
/// The persisted set of active instances.
pub mod state;
pub mod system;
