// src/cli/handlers/query.rs

use anyhow::Result;
use colored::Colorize;

use crate::{
    cli::{dispatcher::Invocation, handlers::commons},
    core::engine,
    models::{Config, Entity, Group, Interface, Mapping, OptionList, Phase},
};

const ALL_PHASES: [Phase; 6] = [
    Phase::PreUp,
    Phase::Up,
    Phase::PostUp,
    Phase::PreDown,
    Phase::Down,
    Phase::PostDown,
];

/// The handler for `query`: describes definitions from the interfaces file.
/// Without targets, every definition name is listed with its kind.
pub fn handle(invocation: &Invocation) -> Result<()> {
    let config = commons::load_config(&invocation.context)?;

    let targets = match &invocation.allow {
        Some(_) => {
            commons::select_targets(&config, &invocation.targets, invocation.allow.as_deref())?
                .targets
        }
        None => invocation.targets.clone(),
    };

    if targets.is_empty() {
        for (name, kind) in summary(&config) {
            println!("  {:<20} {}", name.cyan(), kind.dimmed());
        }
        return Ok(());
    }

    for target in &targets {
        let (instance, explicit) = engine::split_target(target);
        let name = explicit.unwrap_or(instance);

        let lines = if let Some(entity) = config.entity(name) {
            describe_entity(entity)
        } else if let Some(mapping) = config.mapping(name) {
            describe_mapping(mapping)
        } else {
            log::warn!("unknown interface or group '{}'", name);
            eprintln!(
                "{} unknown interface or group '{}'",
                "warning:".yellow(),
                name
            );
            continue;
        };

        println!("\n--- {} ---", name.yellow());
        for line in lines {
            println!("  {}", line);
        }
    }
    Ok(())
}

/// Every definition name with its kind, sorted by name.
fn summary(config: &Config) -> Vec<(&str, &'static str)> {
    let mut names: Vec<(&str, &'static str)> = config
        .entities
        .values()
        .map(|entity| (entity.name(), entity.kind_label()))
        .chain(config.mappings.keys().map(|name| (name.as_str(), "mapping")))
        .collect();
    names.sort();
    names
}

fn describe_entity(entity: &Entity) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<14} {} ({})",
        "kind:",
        entity.kind_label(),
        entity.location()
    )];
    match entity {
        Entity::Interface(iface) => describe_interface(iface, &mut lines),
        Entity::Group(group) => describe_group(group, &mut lines),
    }
    lines
}

fn describe_interface(iface: &Interface, lines: &mut Vec<String>) {
    if let Some(kind) = &iface.kind {
        lines.push(format!("{:<14} {}", "type:", kind.name));
        push_options(&kind.options, lines);
    }
    for proto in &iface.protocols {
        lines.push(format!("{:<14} {} {}", "proto:", proto.kind, proto.method));
        push_options(&proto.options, lines);
    }
    push_command_counts(|phase| iface.commands(phase).len(), lines);
}

fn describe_group(group: &Group, lines: &mut Vec<String>) {
    let dependencies = if group.dependencies.is_empty() {
        "(none)".to_string()
    } else {
        group.dependencies.join(" ")
    };
    lines.push(format!("{:<14} {}", "dependencies:", dependencies));
    push_command_counts(|phase| group.commands(phase).len(), lines);
}

fn describe_mapping(mapping: &Mapping) -> Vec<String> {
    let mut lines = vec![format!("{:<14} mapping ({})", "kind:", mapping.location)];
    for rule in &mapping.rules {
        lines.push(format!("{:<14} {}", "rule:", rule));
    }
    lines
}

fn push_options(options: &OptionList, lines: &mut Vec<String>) {
    for (option, values) in options {
        lines.push(format!("{:<14}   {} {}", "", option, values.join(" ")));
    }
}

fn push_command_counts(count: impl Fn(Phase) -> usize, lines: &mut Vec<String>) {
    for phase in ALL_PHASES {
        let n = count(phase);
        if n > 0 {
            lines.push(format!("{:<14} {} command(s)", format!("{}:", phase), n));
        }
    }
}
