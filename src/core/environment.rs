//! Hook environment construction.
//!
//! An environment is an ordered stack of override maps. Later layers win key by key,
//! so a protocol layer can only replace the keys it defines.

use crate::{
    constants::FALLBACK_PATH,
    core::context::RunContext,
    models::{Mode, Phase},
};
use std::collections::BTreeMap;

/// Flattened environment handed to a hook.
pub type Env = BTreeMap<String, String>;

/// Builds the environment key for an option: `PREFIX_OPTION`, upper-cased, `-` as `_`.
pub fn option_key(prefix: &str, option: &str) -> String {
    format!("{}_{}", prefix, option.replace('-', "_").to_uppercase())
}

/// Which kind of entity a hook is running for.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// Exported as `IFACE`.
    Interface(&'a str),
    /// Exported as `GROUP`.
    Group(&'a str),
}

/// Ordered override maps, applied last-wins.
#[derive(Debug, Clone, Default)]
pub struct EnvLayers<'a> {
    layers: Vec<&'a Env>,
}

impl<'a> EnvLayers<'a> {
    /// Starts with a single base layer.
    pub fn new(base: &'a Env) -> Self {
        Self { layers: vec![base] }
    }

    /// Returns a copy with one more layer on top.
    pub fn with(&self, layer: &'a Env) -> Self {
        let mut next = self.clone();
        next.layers.push(layer);
        next
    }

    /// Merges the layers into one map.
    pub fn flatten(&self) -> Env {
        let mut env = Env::new();
        for layer in &self.layers {
            for (key, value) in layer.iter() {
                env.insert(key.clone(), value.clone());
            }
        }
        env
    }
}

/// The keys every hook receives: subject, `LOGICAL`, `MODE`, `PHASE`, `PATH`, `VERBOSE`.
pub fn base_env(
    subject: Subject<'_>,
    logical: &str,
    mode: Mode,
    phase: Phase,
    context: &RunContext,
) -> Env {
    let (subject_key, instance) = match subject {
        Subject::Interface(name) => ("IFACE", name),
        Subject::Group(name) => ("GROUP", name),
    };
    let path = std::env::var("PATH").unwrap_or_else(|_| FALLBACK_PATH.to_string());

    Env::from([
        (subject_key.to_string(), instance.to_string()),
        ("LOGICAL".to_string(), logical.to_string()),
        ("MODE".to_string(), mode.as_str().to_string()),
        ("PHASE".to_string(), phase.as_str().to_string()),
        ("PATH".to_string(), path),
        (
            "VERBOSE".to_string(),
            if context.verbose { "1" } else { "0" }.to_string(),
        ),
    ])
}
