use crate::core::context::Overrides;
use clap::Parser;

/// Maps action names to handlers.
pub mod dispatcher;
pub mod handlers;

/// ifhook: brings network interfaces and groups up and down through hook scripts.
///
/// Definitions are read from the interfaces file; the actual work is done by the
/// executables in `<hook-root>/iface.d` and `<hook-root>/proto.d`.
///
/// Actions:
///   up    (start)  activate the given targets
///   down  (stop)   deactivate the given targets
///   list  (ls)     show active instances
///   query (show)   describe definitions
///
/// A target may be written `instance=logical` to activate a definition under another name.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about, verbatim_doc_comment)]
#[command(
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
pub struct Cli {
    /// The action to perform: up, down, list or query.
    pub action: String,

    /// Interfaces or groups to act on.
    pub targets: Vec<String>,

    /// Restrict targets to the members of this allow-list.
    /// Without targets, every member of the list is used.
    #[arg(short, long, value_name = "NAME")]
    pub allow: Option<String>,

    /// Print what runs, and pass VERBOSE=1 to hooks.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the environment of every hook before running it.
    #[arg(short = 'e', long = "env")]
    pub dump_env: bool,

    /// Show what would run without running it or touching the state file.
    #[arg(short, long)]
    pub no_act: bool,

    /// Interface definition file.
    #[arg(short = 'i', long = "interfaces", value_name = "PATH")]
    pub config_file: Option<String>,

    /// State file recording active instances.
    #[arg(short, long, value_name = "PATH")]
    pub state_file: Option<String>,

    /// Directory containing `iface.d` and `proto.d`.
    #[arg(short = 'H', long, value_name = "PATH")]
    pub hook_root: Option<String>,

    /// Settings file (TOML). Defaults to /etc/ifhook/ifhook.toml when it exists.
    #[arg(long, value_name = "PATH")]
    pub settings: Option<String>,
}

impl Cli {
    /// The command-line layer of the run context.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_file: self.config_file.clone(),
            state_file: self.state_file.clone(),
            hook_root: self.hook_root.clone(),
            verbose: self.verbose,
            dump_env: self.dump_env,
            no_act: self.no_act,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags_and_targets() {
        let cli = Cli::try_parse_from([
            "ifhook", "-v", "-n", "-a", "auto", "-H", "/opt/hooks", "up", "eth0", "wan=eth1",
        ])
        .unwrap();
        assert_eq!(cli.action, "up");
        assert_eq!(cli.targets, vec!["eth0", "wan=eth1"]);
        assert_eq!(cli.allow.as_deref(), Some("auto"));

        let overrides = cli.overrides();
        assert!(overrides.verbose);
        assert!(overrides.no_act);
        assert!(!overrides.dump_env);
        assert_eq!(overrides.hook_root.as_deref(), Some("/opt/hooks"));
        assert!(overrides.config_file.is_none());
    }

    #[test]
    fn test_action_is_required() {
        assert!(Cli::try_parse_from(["ifhook"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
