//! # Orchestration Engine
//!
//! Drives activation and deactivation of interfaces and groups against the state store.
//!
//! Per target the engine:
//!
//! 1. checks the state store, so repeated requests are no-ops,
//! 2. resolves the instance name to a logical definition (explicit `instance=logical`,
//!    then mappings, then identity),
//! 3. runs the entity's phases through the [`Invoker`],
//! 4. records or removes the state entry in memory.
//!
//! Problems with a single target come back as a [`Diagnostic`]; they never stop the run.
//! Hook failures are logged and otherwise ignored.

use crate::{
    core::{
        context::RunContext,
        environment::{self, Env, EnvLayers, Subject},
    },
    models::{Config, Entity, Group, Interface, Mode, Phase},
    state::StateStore,
    system::executor::{HookError, Invoker},
};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Why a target was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The target has no instance name or an empty logical name.
    #[error("invalid target '{target}'")]
    InvalidTarget {
        /// The target as requested.
        target: String,
    },
    /// Activation of an instance that is already active.
    #[error("'{instance}' is already configured (as '{logical}')")]
    AlreadyConfigured {
        /// The requested instance.
        instance: String,
        /// The logical name it is active under.
        logical: String,
    },
    /// Deactivation of an instance that is not active.
    #[error("'{instance}' is not configured")]
    NotConfigured {
        /// The requested instance.
        instance: String,
    },
    /// A mapping applies to the instance but produced no logical name.
    #[error("mapping '{name}' did not resolve to a definition")]
    MappingUnresolved {
        /// The mapping's name.
        name: String,
    },
    /// No interface or group has the logical name.
    #[error("unknown interface or group '{logical}'")]
    Unknown {
        /// The logical name looked up.
        logical: String,
    },
    /// The instance is already being processed further up the call chain.
    #[error("dependency cycle through '{instance}'")]
    DependencyCycle {
        /// The instance reached twice.
        instance: String,
    },
}

/// Result of one activation or deactivation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Hooks ran and the instance is now recorded.
    Activated {
        /// The activated instance.
        instance: String,
        /// The definition it was activated from.
        logical: String,
    },
    /// Hooks ran and the instance is no longer recorded.
    Deactivated {
        /// The deactivated instance.
        instance: String,
        /// The definition it had been activated from.
        logical: String,
    },
    /// Nothing ran.
    Skipped(Diagnostic),
}

/// Splits `instance=logical`. Without `=`, the logical name is not given.
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('=') {
        Some((instance, logical)) => (instance, Some(logical)),
        None => (target, None),
    }
}

/// Like [`split_target`], but refuses an empty instance or logical part,
/// which could not be recorded in the state file.
fn checked_target(target: &str) -> Result<(&str, Option<&str>), Diagnostic> {
    match split_target(target) {
        ("", _) | (_, Some("")) => Err(Diagnostic::InvalidTarget {
            target: target.to_string(),
        }),
        parts => Ok(parts),
    }
}

/// Runs activations and deactivations for one invocation.
pub struct Engine<'a> {
    config: &'a Config,
    context: &'a RunContext,
    state: &'a mut StateStore,
    invoker: &'a mut dyn Invoker,
    /// Instances currently being processed, innermost last.
    in_progress: Vec<String>,
}

impl std::fmt::Debug for Engine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("context", &self.context)
            .field("in_progress", &self.in_progress)
            .finish_non_exhaustive()
    }
}

impl<'a> Engine<'a> {
    /// Creates an engine over one loaded configuration and state store.
    pub fn new(
        config: &'a Config,
        context: &'a RunContext,
        state: &'a mut StateStore,
        invoker: &'a mut dyn Invoker,
    ) -> Self {
        Self {
            config,
            context,
            state,
            invoker,
            in_progress: Vec::new(),
        }
    }

    /// Brings a target up unless it is already recorded as active.
    pub fn activate(&mut self, target: &str) -> Outcome {
        let (instance, explicit) = match checked_target(target) {
            Ok(parts) => parts,
            Err(diagnostic) => return Outcome::Skipped(diagnostic),
        };

        if let Some(logical) = self.state.get(instance) {
            return Outcome::Skipped(Diagnostic::AlreadyConfigured {
                instance: instance.to_string(),
                logical: logical.to_string(),
            });
        }

        let logical = match self.resolve(instance, explicit) {
            Ok(logical) => logical,
            Err(diagnostic) => return Outcome::Skipped(diagnostic),
        };

        let config = self.config;
        let Some(entity) = config.entity(&logical) else {
            return Outcome::Skipped(Diagnostic::Unknown { logical });
        };

        if let Err(diagnostic) = self.enter(instance) {
            return Outcome::Skipped(diagnostic);
        }
        log::debug!("Activating {} '{}' as '{}'", entity.kind_label(), logical, instance);
        match entity {
            Entity::Interface(iface) => self.start_interface(iface, instance),
            Entity::Group(group) => self.start_group(group, instance),
        }
        self.in_progress.pop();

        self.state.insert(instance, &logical);
        Outcome::Activated {
            instance: instance.to_string(),
            logical,
        }
    }

    /// Brings a target down if it is recorded as active.
    pub fn deactivate(&mut self, target: &str) -> Outcome {
        let (instance, _) = match checked_target(target) {
            Ok(parts) => parts,
            Err(diagnostic) => return Outcome::Skipped(diagnostic),
        };

        let Some(logical) = self.state.get(instance).map(str::to_string) else {
            return Outcome::Skipped(Diagnostic::NotConfigured {
                instance: instance.to_string(),
            });
        };

        let config = self.config;
        let Some(entity) = config.entity(&logical) else {
            return Outcome::Skipped(Diagnostic::Unknown { logical });
        };

        if let Err(diagnostic) = self.enter(instance) {
            return Outcome::Skipped(diagnostic);
        }
        log::debug!("Deactivating {} '{}' ('{}')", entity.kind_label(), instance, logical);
        match entity {
            Entity::Interface(iface) => self.stop_interface(iface, instance),
            Entity::Group(group) => self.stop_group(group, instance),
        }
        self.in_progress.pop();

        self.state.remove(instance);
        Outcome::Deactivated {
            instance: instance.to_string(),
            logical,
        }
    }

    fn resolve(&self, instance: &str, explicit: Option<&str>) -> Result<String, Diagnostic> {
        if let Some(logical) = explicit {
            return Ok(logical.to_string());
        }
        match self.config.mapping(instance) {
            Some(mapping) => mapping
                .resolve(instance)
                .ok_or_else(|| Diagnostic::MappingUnresolved {
                    name: mapping.name.clone(),
                }),
            None => Ok(instance.to_string()),
        }
    }

    fn enter(&mut self, instance: &str) -> Result<(), Diagnostic> {
        if self.in_progress.iter().any(|active| active == instance) {
            return Err(Diagnostic::DependencyCycle {
                instance: instance.to_string(),
            });
        }
        self.in_progress.push(instance.to_string());
        Ok(())
    }

    // --- INTERFACES ---

    fn start_interface(&mut self, iface: &Interface, instance: &str) {
        for phase in Phase::ACTIVATION {
            self.interface_phase(iface, instance, phase, Mode::Start);
        }
    }

    fn stop_interface(&mut self, iface: &Interface, instance: &str) {
        for phase in Phase::DEACTIVATION {
            self.interface_phase(iface, instance, phase, Mode::Stop);
        }
    }

    /// One phase: type hooks, then protocol hooks, then inline commands.
    /// Stopping walks the protocol list backwards.
    fn interface_phase(&mut self, iface: &Interface, instance: &str, phase: Phase, mode: Mode) {
        let base = environment::base_env(
            Subject::Interface(instance),
            &iface.name,
            mode,
            phase,
            self.context,
        );
        let layers = EnvLayers::new(&base);

        if let Some(kind) = &iface.kind {
            let env = layers.with(&kind.env).flatten();
            let dir = self.context.iface_hook_dir();
            self.sweep(&dir, mode, &env);
        }

        let proto_dir = self.context.proto_hook_dir();
        let mut proto_envs: Vec<Env> = if phase.sweeps_protocol_instances() {
            iface
                .protocols
                .iter()
                .map(|proto| layers.with(&proto.env).flatten())
                .collect()
        } else {
            iface
                .protocol_types
                .iter()
                .map(|kind| {
                    let type_only = BTreeMap::from([("PROTO_TYPE".to_string(), kind.clone())]);
                    layers.with(&type_only).flatten()
                })
                .collect()
        };
        if mode == Mode::Stop {
            proto_envs.reverse();
        }
        for env in &proto_envs {
            self.sweep(&proto_dir, mode, env);
        }

        self.commands(iface.commands(phase), &base);
    }

    // --- GROUPS ---

    fn start_group(&mut self, group: &Group, instance: &str) {
        let env = |phase| {
            environment::base_env(
                Subject::Group(instance),
                &group.name,
                Mode::Start,
                phase,
                self.context,
            )
        };
        let pre_up = env(Phase::PreUp);
        let post_up = env(Phase::PostUp);

        self.commands(group.commands(Phase::PreUp), &pre_up);
        for dependency in &group.dependencies {
            let outcome = self.activate(dependency);
            log_dependency(&group.name, &outcome);
        }
        self.commands(group.commands(Phase::PostUp), &post_up);
    }

    fn stop_group(&mut self, group: &Group, instance: &str) {
        let env = |phase| {
            environment::base_env(
                Subject::Group(instance),
                &group.name,
                Mode::Stop,
                phase,
                self.context,
            )
        };
        let pre_down = env(Phase::PreDown);
        let post_down = env(Phase::PostDown);

        self.commands(group.commands(Phase::PreDown), &pre_down);
        for dependency in group.dependencies.iter().rev() {
            let outcome = self.deactivate(dependency);
            log_dependency(&group.name, &outcome);
        }
        self.commands(group.commands(Phase::PostDown), &post_down);
    }

    // --- INVOCATION ---

    fn sweep(&mut self, dir: &Path, mode: Mode, env: &Env) {
        let result = self.invoker.run_hook_dir(dir, mode.sweep_order(), env);
        report_hook_error(result);
    }

    fn commands(&mut self, commands: &[String], env: &Env) {
        for command in commands {
            let result = self.invoker.run_command(command, env);
            report_hook_error(result);
        }
    }
}

fn report_hook_error(result: Result<(), HookError>) {
    if let Err(e) = result {
        log::warn!("{}", e);
    }
}

fn log_dependency(group: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Skipped(diagnostic @ Diagnostic::AlreadyConfigured { .. })
        | Outcome::Skipped(diagnostic @ Diagnostic::NotConfigured { .. }) => {
            log::info!("group '{}': {}", group, diagnostic);
        }
        Outcome::Skipped(diagnostic) => log::warn!("group '{}': {}", group, diagnostic),
        Outcome::Activated { instance, .. } | Outcome::Deactivated { instance, .. } => {
            log::debug!("group '{}': processed dependency '{}'", group, instance);
        }
    }
}
