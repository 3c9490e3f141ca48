// src/cli/handlers/list.rs

use anyhow::Result;
use colored::Colorize;

use crate::{
    cli::{dispatcher::Invocation, handlers::commons},
    core::engine,
    state::{Entries, StateStore},
};

/// The handler for `list`: prints active instances as `instance=logical`.
/// With targets (or `--allow`), only those instances are shown.
pub fn handle(invocation: &Invocation) -> Result<()> {
    let state = StateStore::load(&invocation.context.state_file)?;

    let wanted = match &invocation.allow {
        Some(_) => {
            let config = commons::load_config(&invocation.context)?;
            let selection = commons::select_targets(
                &config,
                &invocation.targets,
                invocation.allow.as_deref(),
            )?;
            Some(selection.targets)
        }
        None if invocation.targets.is_empty() => None,
        None => Some(invocation.targets.clone()),
    };

    let (shown, inactive) = active_entries(state.entries(), wanted.as_deref());
    for (instance, logical) in shown {
        println!("{}={}", instance.cyan(), logical);
    }
    if invocation.context.verbose {
        for instance in inactive {
            eprintln!("{} '{}' is not configured", "note:".dimmed(), instance);
        }
    }
    Ok(())
}

/// Splits the requested instances into recorded entries and the ones not recorded.
/// Without a request every entry is returned, sorted by instance.
fn active_entries<'a>(
    entries: &'a Entries,
    wanted: Option<&'a [String]>,
) -> (Vec<(&'a str, &'a str)>, Vec<&'a str>) {
    let Some(wanted) = wanted else {
        let all = entries
            .iter()
            .map(|(instance, logical)| (instance.as_str(), logical.as_str()))
            .collect();
        return (all, Vec::new());
    };

    let mut shown = Vec::new();
    let mut inactive = Vec::new();
    for target in wanted {
        let (instance, _) = engine::split_target(target);
        match entries.get_key_value(instance) {
            Some((instance, logical)) => shown.push((instance.as_str(), logical.as_str())),
            None => inactive.push(instance),
        }
    }
    (shown, inactive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::parse_entries;

    #[test]
    fn test_all_entries_sorted() {
        let entries = parse_entries("wlan0=home\neth0=eth0\n");
        let (shown, inactive) = active_entries(&entries, None);
        assert_eq!(shown, vec![("eth0", "eth0"), ("wlan0", "home")]);
        assert!(inactive.is_empty());
    }

    #[test]
    fn test_requested_entries_keep_request_order() {
        let entries = parse_entries("wlan0=home\neth0=eth0\n");
        let wanted = vec!["wlan0".to_string(), "br0".to_string(), "eth0=x".to_string()];
        let (shown, inactive) = active_entries(&entries, Some(wanted.as_slice()));
        assert_eq!(shown, vec![("wlan0", "home"), ("eth0", "eth0")]);
        assert_eq!(inactive, vec!["br0"]);
    }
}
