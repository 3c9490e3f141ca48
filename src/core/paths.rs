// src/core/paths.rs

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while expanding a path.
#[derive(Error, Debug)]
pub enum PathError {
    /// A variable in the template is not set.
    #[error("Failed to expand path template '{template}': {message}")]
    Expansion {
        /// The path as written.
        template: String,
        /// What went wrong.
        message: String,
    },
}

/// Expands a user-supplied path, resolving the home directory (`~`) and
/// environment variables (`$VAR` / `${VAR}`).
///
/// # Errors
/// Returns an error if a referenced environment variable is not set.
pub fn expand_path(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
