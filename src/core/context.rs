//! # Run Context
//!
//! The immutable value threaded through the parser and the engine. It is built once
//! per run from three layers, last one wins:
//!
//! 1. compiled-in defaults (`constants`),
//! 2. an optional TOML settings file,
//! 3. command-line overrides.

use crate::{
    constants::{
        DEFAULT_CONFIG_FILE, DEFAULT_HOOK_ROOT, DEFAULT_SETTINGS_FILE, DEFAULT_STATE_FILE,
        IFACE_HOOK_DIR, PROTO_HOOK_DIR,
    },
    core::paths::{self, PathError},
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while building the run context.
#[derive(Error, Debug)]
pub enum ContextError {
    /// The settings file exists but cannot be read.
    #[error("Could not read settings file '{path}': {source}")]
    Io {
        /// The settings file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid TOML for [`Settings`].
    #[error("Failed to parse settings file '{path}': {source}")]
    TomlParse {
        /// The settings file.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// A configured path could not be expanded.
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Contents of the optional settings file.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Interface definition file.
    pub config_file: Option<String>,
    /// State file recording active instances.
    pub state_file: Option<String>,
    /// Directory containing `iface.d` and `proto.d`.
    pub hook_root: Option<String>,
    /// Verbose output by default.
    pub verbose: Option<bool>,
}

impl Settings {
    /// Loads settings from `path`.
    pub fn load(path: &Path) -> Result<Self, ContextError> {
        let content = fs::read_to_string(path).map_err(|source| ContextError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ContextError::TomlParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the explicitly requested settings file, or the default one if it exists.
    pub fn discover(explicit: Option<&str>) -> Result<Self, ContextError> {
        match explicit {
            Some(template) => Self::load(&paths::expand_path(template)?),
            None => {
                let default = Path::new(DEFAULT_SETTINGS_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    log::debug!("No settings file at '{}'", default.display());
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Command-line overrides. `None` / `false` leave the lower layers in place.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--interfaces`
    pub config_file: Option<String>,
    /// `--state-file`
    pub state_file: Option<String>,
    /// `--hook-root`
    pub hook_root: Option<String>,
    /// `--verbose`
    pub verbose: bool,
    /// `--env`
    pub dump_env: bool,
    /// `--no-act`
    pub no_act: bool,
}

/// Everything a run needs to know about its surroundings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Interface definition file.
    pub config_file: PathBuf,
    /// State file recording active instances.
    pub state_file: PathBuf,
    /// Directory containing `iface.d` and `proto.d`.
    pub hook_root: PathBuf,
    /// Extra output, and `VERBOSE=1` for hooks.
    pub verbose: bool,
    /// Print each hook's environment before running it.
    pub dump_env: bool,
    /// Show what would run without running it or touching the state file.
    pub no_act: bool,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            hook_root: PathBuf::from(DEFAULT_HOOK_ROOT),
            verbose: false,
            dump_env: false,
            no_act: false,
        }
    }
}

impl RunContext {
    /// Layers settings and overrides on top of the defaults.
    pub fn resolve(settings: &Settings, overrides: &Overrides) -> Result<Self, ContextError> {
        let defaults = Self::default();

        let pick = |flag: &Option<String>,
                    setting: &Option<String>,
                    default: PathBuf|
         -> Result<PathBuf, ContextError> {
            match flag.as_ref().or(setting.as_ref()) {
                Some(template) => Ok(paths::expand_path(template)?),
                None => Ok(default),
            }
        };

        let context = Self {
            config_file: pick(
                &overrides.config_file,
                &settings.config_file,
                defaults.config_file,
            )?,
            state_file: pick(
                &overrides.state_file,
                &settings.state_file,
                defaults.state_file,
            )?,
            hook_root: pick(&overrides.hook_root, &settings.hook_root, defaults.hook_root)?,
            verbose: overrides.verbose || settings.verbose.unwrap_or(false),
            dump_env: overrides.dump_env,
            no_act: overrides.no_act,
        };
        log::debug!("Resolved run context: {:?}", context);
        Ok(context)
    }

    /// Directory of interface type hooks.
    pub fn iface_hook_dir(&self) -> PathBuf {
        self.hook_root.join(IFACE_HOOK_DIR)
    }

    /// Directory of protocol hooks.
    pub fn proto_hook_dir(&self) -> PathBuf {
        self.hook_root.join(PROTO_HOOK_DIR)
    }
}
