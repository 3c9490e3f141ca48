// src/cli/handlers/commons.rs

// Shared pieces of the action handlers.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;

use crate::{
    cli::dispatcher::Invocation,
    core::{
        compiler,
        context::RunContext,
        engine::{self, Engine, Outcome},
        parser,
    },
    models::{Config, Mode},
    state::StateStore,
    system::executor::SystemInvoker,
};

/// Parses and compiles the configured interfaces file. Any error here is fatal.
pub fn load_config(context: &RunContext) -> Result<Config> {
    let path = &context.config_file;
    let describe = || format!("Invalid configuration in '{}'", path.display());
    let lines = parser::parse_file(path).with_context(describe)?;
    let config = compiler::compile(&lines).with_context(describe)?;
    Ok(config)
}

/// Result of applying the allow-list filter to the requested targets.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Targets that passed the filter, in request order.
    pub targets: Vec<String>,
    /// Targets removed because the allow-list does not contain them.
    pub rejected: Vec<String>,
}

/// Applies `--allow`. Without targets, the members of the list become the targets.
/// An `instance=logical` target is matched on its instance part.
pub fn select_targets(config: &Config, targets: &[String], allow: Option<&str>) -> Result<Selection> {
    let Some(list) = allow else {
        return Ok(Selection {
            targets: targets.to_vec(),
            rejected: Vec::new(),
        });
    };

    let members = config
        .allowed(list)
        .ok_or_else(|| anyhow!("No allow-list named '{}' is defined", list))?;

    if targets.is_empty() {
        return Ok(Selection {
            targets: members.iter().cloned().collect(),
            rejected: Vec::new(),
        });
    }

    let (targets, rejected): (Vec<String>, Vec<String>) = targets
        .iter()
        .cloned()
        .partition(|target| members.contains(engine::split_target(target).0));
    Ok(Selection { targets, rejected })
}

/// Selects targets for `up`/`down`, reporting the ones the allow-list drops.
pub fn resolve_targets(config: &Config, invocation: &Invocation) -> Result<Vec<String>> {
    if invocation.targets.is_empty() && invocation.allow.is_none() {
        return Err(anyhow!(
            "No targets given. Name interfaces or groups, or use --allow NAME."
        ));
    }

    let selection = select_targets(config, &invocation.targets, invocation.allow.as_deref())?;
    for target in &selection.rejected {
        log::warn!("'{}' is not in the allow-list, skipping", target);
        eprintln!(
            "{} '{}' is not in allow-list '{}', skipping",
            "warning:".yellow(),
            target,
            invocation.allow.as_deref().unwrap_or_default()
        );
    }
    Ok(selection.targets)
}

/// Prints the outcome of one target. Skipped targets go to stderr.
pub fn report(outcome: &Outcome, verbose: bool) {
    match outcome {
        Outcome::Activated { instance, logical } => {
            log::info!("'{}' is up (as '{}')", instance, logical);
            if verbose {
                println!("{} {}", "up".green().bold(), instance);
            }
        }
        Outcome::Deactivated { instance, logical } => {
            log::info!("'{}' is down (was '{}')", instance, logical);
            if verbose {
                println!("{} {}", "down".green().bold(), instance);
            }
        }
        Outcome::Skipped(diagnostic) => {
            log::warn!("{}", diagnostic);
            eprintln!("{} {}", "warning:".yellow(), diagnostic);
        }
    }
}

/// Shared body of `up` and `down`: parse, load state, process every target, persist once.
pub fn run_targets(invocation: &Invocation, mode: Mode) -> Result<()> {
    let context = &invocation.context;
    let config = load_config(context)?;
    let targets = resolve_targets(&config, invocation)?;

    let mut state = StateStore::load(&context.state_file)?;
    let mut invoker = SystemInvoker::new(context);
    {
        let mut engine = Engine::new(&config, context, &mut state, &mut invoker);
        for target in &targets {
            let outcome = match mode {
                Mode::Start => engine.activate(target),
                Mode::Stop => engine.deactivate(target),
            };
            report(&outcome, context.verbose);
        }
    }

    if context.no_act {
        log::debug!("--no-act: state file '{}' left untouched", state.path().display());
    } else if state.needs_saving() {
        state.persist()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_source;
    use std::path::Path;

    fn config() -> Config {
        let lines = parse_source(
            Path::new("/etc/ifhook/interfaces"),
            "allow auto lo eth0\niface lo\niface eth0\niface eth1\n",
        )
        .unwrap();
        compiler::compile(&lines).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_without_allow_targets_pass_through() {
        let selection = select_targets(&config(), &strings(&["eth1", "x"]), None).unwrap();
        assert_eq!(selection.targets, strings(&["eth1", "x"]));
        assert!(selection.rejected.is_empty());
    }

    #[test]
    fn test_allow_filters_targets() {
        let selection =
            select_targets(&config(), &strings(&["eth0", "eth1", "eth0=eth1"]), Some("auto"))
                .unwrap();
        assert_eq!(selection.targets, strings(&["eth0", "eth0=eth1"]));
        assert_eq!(selection.rejected, strings(&["eth1"]));
    }

    #[test]
    fn test_allow_without_targets_uses_members_sorted() {
        let selection = select_targets(&config(), &[], Some("auto")).unwrap();
        assert_eq!(selection.targets, strings(&["eth0", "lo"]));
    }

    #[test]
    fn test_unknown_allow_list_fails() {
        assert!(select_targets(&config(), &[], Some("hotplug")).is_err());
    }

    #[test]
    fn test_up_down_need_targets_or_allow() {
        let invocation = Invocation {
            context: RunContext::default(),
            targets: vec![],
            allow: None,
        };
        assert!(resolve_targets(&config(), &invocation).is_err());
    }
}
