// src/bin/ifhook.rs

//! The `ifhook` command-line tool.

use clap::Parser;
use colored::*;
use ifhook::cli::{Cli, dispatcher};

/// The main entry point of the `ifhook` application.
/// It sets up logging, parses arguments, dispatches to the action handler,
/// and performs centralized error handling.
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = dispatcher::dispatch(cli) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output with `-v`.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}
