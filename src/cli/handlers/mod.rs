// src/cli/handlers/mod.rs

//! One module per CLI action.

/// Helpers shared by the handlers.
pub mod commons;
/// `down` / `stop`
pub mod down;
/// `list` / `ls`
pub mod list;
/// `query` / `show`
pub mod query;
/// `up` / `start`
pub mod up;
