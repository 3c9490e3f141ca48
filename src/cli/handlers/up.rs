// src/cli/handlers/up.rs

use anyhow::Result;

use crate::{cli::dispatcher::Invocation, cli::handlers::commons, models::Mode};

/// The handler for `up`: activates every selected target in order.
pub fn handle(invocation: &Invocation) -> Result<()> {
    commons::run_targets(invocation, Mode::Start)
}
