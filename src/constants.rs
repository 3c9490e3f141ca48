// src/constants.rs

/// Default location of the interface definition file.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/ifhook/interfaces";

/// Default location of the state file recording active instances.
pub const DEFAULT_STATE_FILE: &str = "/run/ifhook/state";

/// Default root directory holding the `iface.d/` and `proto.d/` hook directories.
pub const DEFAULT_HOOK_ROOT: &str = "/usr/libexec/ifhook";

/// Settings file consulted when `--settings` is not given. Optional.
pub const DEFAULT_SETTINGS_FILE: &str = "/etc/ifhook/ifhook.toml";

/// Hook directory (under the hook root) for interface type scripts.
pub const IFACE_HOOK_DIR: &str = "iface.d";

/// Hook directory (under the hook root) for protocol scripts.
pub const PROTO_HOOK_DIR: &str = "proto.d";

/// `PATH` handed to hooks when the process itself has none.
pub const FALLBACK_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";

/// Shell used for inline phase commands.
pub const SHELL: &str = "/bin/sh";

/// Tab stops used when measuring indentation.
pub const TAB_WIDTH: usize = 8;

/// Environment key prefix for interface type options.
pub const IFACE_ENV_PREFIX: &str = "IFACE";

/// Environment key prefix for protocol options.
pub const PROTO_ENV_PREFIX: &str = "PROTO";
