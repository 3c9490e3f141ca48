//! # Compiler
//!
//! Turns the parsed line forest into the typed [`Config`] model: interfaces, groups,
//! mappings and allow-lists. Everything that can be checked statically is checked
//! here (unknown keywords, missing operands, duplicate names, environment key
//! collisions), so a configuration that compiles can be executed without parse errors.

use crate::{
    constants::{IFACE_ENV_PREFIX, PROTO_ENV_PREFIX},
    core::{
        environment,
        parser::{ConfigLine, ParseError},
    },
    models::{Config, Entity, Group, Interface, Mapping, OptionList, Phase, ProtoDef, TypeDef},
};
use std::collections::{BTreeMap, btree_map::Entry};

// --- PUBLIC COMPILER API ---

/// Compiles top-level lines into a [`Config`].
pub fn compile(lines: &[ConfigLine]) -> Result<Config, ParseError> {
    let mut config = Config::default();

    for line in lines {
        match line.keyword() {
            "allow" => compile_allow(line, &mut config)?,
            "iface" | "interface" => {
                let iface = compile_interface(line)?;
                insert_entity(&mut config, Entity::Interface(iface))?;
            }
            "group" => {
                let group = compile_group(line)?;
                insert_entity(&mut config, Entity::Group(group))?;
            }
            "mapping" => compile_mapping(line, &mut config)?,
            other => {
                return Err(ParseError::UnknownKeyword {
                    keyword: other.to_string(),
                    context: " at top level".to_string(),
                    location: line.location().clone(),
                });
            }
        }
    }

    log::debug!(
        "Compiled {} definition(s), {} mapping(s), {} allow-list(s)",
        config.entities.len(),
        config.mappings.len(),
        config.allow.len()
    );
    Ok(config)
}

fn insert_entity(config: &mut Config, entity: Entity) -> Result<(), ParseError> {
    match config.entities.entry(entity.name().to_string()) {
        Entry::Occupied(existing) => Err(ParseError::Duplicate {
            kind: "interface or group",
            name: entity.name().to_string(),
            first: existing.get().location().clone(),
            location: entity.location().clone(),
        }),
        Entry::Vacant(slot) => {
            slot.insert(entity);
            Ok(())
        }
    }
}

// --- TOP-LEVEL STATEMENTS ---

fn compile_allow(line: &ConfigLine, config: &mut Config) -> Result<(), ParseError> {
    no_block(line)?;
    let words = line.words()?;
    let (name, members) = match words {
        [_, name, members @ ..] if !members.is_empty() => (name, members),
        _ => return Err(missing(line, "a list name and at least one member")),
    };
    config
        .allow
        .entry(name.clone())
        .or_default()
        .extend(members.iter().cloned());
    Ok(())
}

fn compile_interface(line: &ConfigLine) -> Result<Interface, ParseError> {
    let name = single_name(line)?;
    let mut kind: Option<(TypeDef, &ConfigLine)> = None;
    let mut protocols = Vec::new();
    let mut commands: BTreeMap<Phase, Vec<String>> = BTreeMap::new();

    for sub in line.children() {
        let keyword = sub.keyword();
        if let Some(phase) = Phase::from_keyword(keyword) {
            commands
                .entry(phase)
                .or_default()
                .extend(phase_commands(sub)?);
            continue;
        }
        match keyword {
            "type" => {
                if let Some((_, first)) = &kind {
                    return Err(ParseError::Duplicate {
                        kind: "type",
                        name: name.clone(),
                        first: first.location().clone(),
                        location: sub.location().clone(),
                    });
                }
                kind = Some((compile_type(sub)?, sub));
            }
            "proto" => protocols.push(compile_proto(sub)?),
            other => {
                return Err(ParseError::UnknownKeyword {
                    keyword: other.to_string(),
                    context: format!(" in interface '{}'", name),
                    location: sub.location().clone(),
                });
            }
        }
    }

    let mut protocol_types: Vec<String> = Vec::new();
    for proto in &protocols {
        if !protocol_types.contains(&proto.kind) {
            protocol_types.push(proto.kind.clone());
        }
    }

    Ok(Interface {
        name,
        kind: kind.map(|(def, _)| def),
        protocols,
        protocol_types,
        commands,
        location: line.location().clone(),
    })
}

fn compile_group(line: &ConfigLine) -> Result<Group, ParseError> {
    let words = line.words()?;
    let (name, dependencies) = match words {
        [_, name, deps @ ..] => (name.clone(), deps.to_vec()),
        _ => return Err(missing(line, "a name")),
    };

    let mut commands: BTreeMap<Phase, Vec<String>> = BTreeMap::new();
    for sub in line.children() {
        match Phase::from_keyword(sub.keyword()) {
            Some(phase) if phase.allowed_in_group() => {
                commands
                    .entry(phase)
                    .or_default()
                    .extend(phase_commands(sub)?);
            }
            _ => {
                return Err(ParseError::UnknownKeyword {
                    keyword: sub.keyword().to_string(),
                    context: format!(" in group '{}'", name),
                    location: sub.location().clone(),
                });
            }
        }
    }

    Ok(Group {
        name,
        dependencies,
        commands,
        location: line.location().clone(),
    })
}

fn compile_mapping(line: &ConfigLine, config: &mut Config) -> Result<(), ParseError> {
    let name = single_name(line)?;
    let mut rules = Vec::new();
    for sub in line.children() {
        no_block(sub)?;
        rules.push(sub.content().to_string());
    }
    let mapping = Mapping {
        name: name.clone(),
        rules,
        location: line.location().clone(),
    };

    match config.mappings.entry(name) {
        Entry::Occupied(existing) => Err(ParseError::Duplicate {
            kind: "mapping",
            name: mapping.name.clone(),
            first: existing.get().location.clone(),
            location: mapping.location,
        }),
        Entry::Vacant(slot) => {
            slot.insert(mapping);
            Ok(())
        }
    }
}

// --- INTERFACE BLOCKS ---

/// Commands of a phase: text after the keyword (if any), then each subline verbatim.
/// A command line cannot open a block of its own.
fn phase_commands(line: &ConfigLine) -> Result<Vec<String>, ParseError> {
    let mut commands: Vec<String> = Some(line.rest())
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
        .into_iter()
        .collect();
    for sub in line.children() {
        no_block(sub)?;
        commands.push(sub.content().to_string());
    }
    Ok(commands)
}

fn compile_type(line: &ConfigLine) -> Result<TypeDef, ParseError> {
    let words = line.words()?;
    let name = match words {
        [_, name] => name.clone(),
        [_] => return Err(missing(line, "a type name")),
        _ => return Err(too_many(line)),
    };
    let options = compile_options(line)?;

    let mut env = BTreeMap::from([(format!("{IFACE_ENV_PREFIX}_TYPE"), name.clone())]);
    option_env(IFACE_ENV_PREFIX, &options, &mut env, line)?;

    Ok(TypeDef { name, options, env })
}

fn compile_proto(line: &ConfigLine) -> Result<ProtoDef, ParseError> {
    let words = line.words()?;
    let (kind, method) = match words {
        [_, kind, method] => (kind.clone(), method.clone()),
        [_] | [_, _] => return Err(missing(line, "a protocol type and a method")),
        _ => return Err(too_many(line)),
    };
    let options = compile_options(line)?;

    let mut env = BTreeMap::from([
        (format!("{PROTO_ENV_PREFIX}_TYPE"), kind.clone()),
        (format!("{PROTO_ENV_PREFIX}_METHOD"), method.clone()),
    ]);
    option_env(PROTO_ENV_PREFIX, &options, &mut env, line)?;

    Ok(ProtoDef {
        kind,
        method,
        options,
        env,
    })
}

/// Sublines of `type`/`proto`: the first word names the option, the rest are its values.
fn compile_options(line: &ConfigLine) -> Result<OptionList, ParseError> {
    let mut options = OptionList::new();
    for sub in line.children() {
        no_block(sub)?;
        let words = sub.words()?;
        let Some((option, values)) = words.split_first() else {
            return Err(missing(sub, "an option name"));
        };
        options.push((option.clone(), values.to_vec()));
    }
    Ok(options)
}

/// Adds one environment key per option, refusing keys that are already taken.
fn option_env(
    prefix: &str,
    options: &OptionList,
    env: &mut BTreeMap<String, String>,
    line: &ConfigLine,
) -> Result<(), ParseError> {
    // `compile_options` yields exactly one option per subline, in order.
    for (sub, (option, values)) in line.children().iter().zip(options) {
        let key = environment::option_key(prefix, option);
        if env.contains_key(&key) {
            return Err(ParseError::EnvKeyCollision {
                option: option.clone(),
                key,
                location: sub.location().clone(),
            });
        }
        env.insert(key, values.join(" "));
    }
    Ok(())
}

// --- HELPERS ---

fn single_name(line: &ConfigLine) -> Result<String, ParseError> {
    match line.words()? {
        [_, name] => Ok(name.clone()),
        [_] => Err(missing(line, "a name")),
        _ => Err(too_many(line)),
    }
}

fn no_block(line: &ConfigLine) -> Result<(), ParseError> {
    if line.children().is_empty() {
        Ok(())
    } else {
        Err(ParseError::UnexpectedBlock {
            keyword: line.keyword().to_string(),
            location: line.location().clone(),
        })
    }
}

fn missing(line: &ConfigLine, expected: &'static str) -> ParseError {
    ParseError::MissingOperand {
        keyword: line.keyword().to_string(),
        expected,
        location: line.location().clone(),
    }
}

fn too_many(line: &ConfigLine) -> ParseError {
    ParseError::TooManyOperands {
        keyword: line.keyword().to_string(),
        location: line.location().clone(),
    }
}
