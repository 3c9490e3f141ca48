use anyhow::{Result, anyhow};

use crate::{
    cli::{Cli, handlers},
    core::context::{RunContext, Settings},
};

/// Everything a handler receives: the resolved context and the command-line selection.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Resolved paths and flags.
    pub context: RunContext,
    /// Targets as given on the command line.
    pub targets: Vec<String>,
    /// The `--allow` list name.
    pub allow: Option<String>,
}

// --- Command Definition and Registry ---

/// Defines an action, its aliases, and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(&Invocation) -> Result<()>,
}

/// The single source of truth for all actions.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "up",
        aliases: &["start"],
        handler: handlers::up::handle,
    },
    CommandDefinition {
        name: "down",
        aliases: &["stop"],
        handler: handlers::down::handle,
    },
    CommandDefinition {
        name: "list",
        aliases: &["ls"],
        handler: handlers::list::handle,
    },
    CommandDefinition {
        name: "query",
        aliases: &["show"],
        handler: handlers::query::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Resolves the action and the run context, then hands over to the action's handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let command = find_command(&cli.action).ok_or_else(|| {
        let known: Vec<&str> = COMMAND_REGISTRY.iter().map(|cmd| cmd.name).collect();
        anyhow!(
            "Unknown action '{}'. Expected one of: {}",
            cli.action,
            known.join(", ")
        )
    })?;

    let settings = Settings::discover(cli.settings.as_deref())?;
    let context = RunContext::resolve(&settings, &cli.overrides())?;

    let invocation = Invocation {
        context,
        targets: cli.targets,
        allow: cli.allow,
    };
    (command.handler)(&invocation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_command_by_name_and_alias() {
        assert_eq!(find_command("up").map(|c| c.name), Some("up"));
        assert_eq!(find_command("stop").map(|c| c.name), Some("down"));
        assert_eq!(find_command("show").map(|c| c.name), Some("query"));
        assert!(find_command("restart").is_none());
    }

    #[test]
    fn test_unknown_action_fails_before_touching_files() {
        let cli = Cli {
            action: "restart".to_string(),
            targets: vec![],
            allow: None,
            verbose: false,
            dump_env: false,
            no_act: false,
            config_file: None,
            state_file: None,
            hook_root: None,
            settings: Some("/nonexistent/ifhook.toml".to_string()),
        };
        let err = dispatch(cli).unwrap_err();
        assert!(err.to_string().contains("Unknown action 'restart'"));
    }
}
