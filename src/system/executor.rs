// src/system/executor.rs

use crate::{
    constants::SHELL,
    core::{context::RunContext, environment::Env},
    models::SweepOrder,
};
use colored::*;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while starting hooks. Exit statuses are not errors.
#[derive(Error, Debug)]
pub enum HookError {
    /// A hook directory exists but cannot be read.
    #[error("Hook directory '{path}' could not be listed: {source}")]
    ListDir {
        /// The hook directory.
        path: PathBuf,
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },
    /// A hook or command could not be spawned.
    #[error("'{0}' could not be executed: {1}")]
    Spawn(String, std::io::Error),
}

/// The boundary to the hook scripts. The engine only talks to this trait.
pub trait Invoker {
    /// Runs every executable member of `dir` in the given order.
    fn run_hook_dir(&mut self, dir: &Path, order: SweepOrder, env: &Env) -> Result<(), HookError>;

    /// Runs one inline phase command.
    fn run_command(&mut self, command: &str, env: &Env) -> Result<(), HookError>;
}

/// Runs hooks as child processes, one at a time.
///
/// Exit statuses are reported but never stop a sweep or the run.
#[derive(Debug)]
pub struct SystemInvoker<'a> {
    context: &'a RunContext,
}

impl<'a> SystemInvoker<'a> {
    /// Creates an invoker for one run.
    pub fn new(context: &'a RunContext) -> Self {
        Self { context }
    }

    fn execute(&self, label: &str, mut command: StdCommand, env: &Env) -> Result<(), HookError> {
        if self.context.dump_env {
            println!("{}", format!("# environment for {label}").dimmed());
            for (key, value) in env {
                let quoted = shlex::try_quote(value).unwrap_or(Cow::Borrowed(value.as_str()));
                println!("{key}={quoted}");
            }
        }

        if self.context.no_act {
            println!("{} {}", "would run".yellow(), label.green());
            return Ok(());
        }
        if self.context.verbose {
            println!("{} {}", "→".blue(), label.green());
        }

        command
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = command
            .status()
            .map_err(|e| HookError::Spawn(label.to_string(), e))?;

        if !status.success() {
            log::warn!("'{}' exited with {}", label, status);
            if self.context.verbose {
                println!("{} '{}' exited with {}", "warning:".yellow(), label, status);
            }
        }
        Ok(())
    }
}

impl Invoker for SystemInvoker<'_> {
    fn run_hook_dir(&mut self, dir: &Path, order: SweepOrder, env: &Env) -> Result<(), HookError> {
        let mut scripts = list_hooks(dir)?;
        if order == SweepOrder::Descending {
            scripts.reverse();
        }
        log::debug!(
            "Sweeping {} hook(s) in '{}' ({:?})",
            scripts.len(),
            dir.display(),
            order
        );

        for script in scripts {
            let label = script.display().to_string();
            // One failing hook must not stop the rest of the sweep.
            if let Err(e) = self.execute(&label, StdCommand::new(&script), env) {
                log::warn!("{}", e);
            }
        }
        Ok(())
    }

    fn run_command(&mut self, command: &str, env: &Env) -> Result<(), HookError> {
        let mut process = StdCommand::new(SHELL);
        process.arg("-c").arg(command);
        self.execute(command, process, env)
    }
}

/// Executable regular files of a hook directory, sorted ascending by name.
/// A missing directory has no hooks.
pub fn list_hooks(dir: &Path) -> Result<Vec<PathBuf>, HookError> {
    if !dir.is_dir() {
        log::debug!("Hook directory '{}' does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut hooks = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| HookError::ListDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || name.ends_with('~') {
            continue;
        }
        if is_executable(entry.path()) {
            hooks.push(entry.into_path());
        }
    }
    Ok(hooks)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_script(dir: &Path, name: &str, body: &str, mode: u32) {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    fn env_with(log: &Path) -> Env {
        Env::from([
            ("LOG".to_string(), log.display().to_string()),
            ("PATH".to_string(), "/usr/bin:/bin".to_string()),
            ("PHASE".to_string(), "up".to_string()),
        ])
    }

    #[test]
    fn test_list_hooks_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        write_script(dir.path(), "20-b", "true", 0o755);
        write_script(dir.path(), "10-a", "true", 0o755);
        write_script(dir.path(), "30-not-exec", "true", 0o644);
        write_script(dir.path(), ".hidden", "true", 0o755);
        write_script(dir.path(), "10-a~", "true", 0o755);

        let names: Vec<String> = list_hooks(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["10-a", "20-b"]);
    }

    #[test]
    fn test_missing_directory_has_no_hooks() {
        let dir = TempDir::new().unwrap();
        assert!(list_hooks(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_sweep_order_and_failure_tolerance() {
        let dir = TempDir::new().unwrap();
        let hooks = dir.path().join("iface.d");
        fs::create_dir(&hooks).unwrap();
        let log = dir.path().join("log");
        write_script(&hooks, "10-first", "echo first-$PHASE >> \"$LOG\"", 0o755);
        write_script(&hooks, "20-fails", "echo fails >> \"$LOG\"; exit 3", 0o755);
        write_script(&hooks, "30-last", "echo last >> \"$LOG\"", 0o755);

        let context = RunContext::default();
        let mut invoker = SystemInvoker::new(&context);
        invoker
            .run_hook_dir(&hooks, SweepOrder::Ascending, &env_with(&log))
            .unwrap();
        invoker
            .run_hook_dir(&hooks, SweepOrder::Descending, &env_with(&log))
            .unwrap();

        let lines: Vec<String> = fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(
            lines,
            vec!["first-up", "fails", "last", "last", "fails", "first-up"]
        );
    }

    #[test]
    fn test_run_command_uses_only_constructed_env() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("log");
        let context = RunContext::default();
        let mut invoker = SystemInvoker::new(&context);

        // HOME is not part of the constructed environment.
        invoker
            .run_command("echo \"${HOME:-unset} $PHASE\" > \"$LOG\"", &env_with(&log))
            .unwrap();
        assert_eq!(fs::read_to_string(&log).unwrap(), "unset up\n");
    }

    #[test]
    fn test_no_act_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("log");
        let context = RunContext {
            no_act: true,
            ..RunContext::default()
        };
        let mut invoker = SystemInvoker::new(&context);
        invoker
            .run_command("echo ran > \"$LOG\"", &env_with(&log))
            .unwrap();
        assert!(!log.exists());
    }
}
