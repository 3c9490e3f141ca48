//! # System Interaction Layer
//!
//! The boundary between the orchestration engine and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: the [`executor::Invoker`] trait the engine talks to, and the
//!   process-spawning implementation that runs hook directories and inline commands.

pub mod executor;
