// src/state.rs

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Instance name -> logical definition name.
pub type Entries = BTreeMap<String, String>;

/// Errors raised while loading or persisting the state file.
#[derive(Error, Debug)]
pub enum StateError {
    /// The state file exists but cannot be read.
    #[error("Could not read state file '{path}': {source}")]
    Read {
        /// The state file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The state file cannot be replaced.
    #[error("Could not write state file '{path}': {source}")]
    Write {
        /// The state file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Represents the state of the store.
/// It holds the current entries and, once mutated, a snapshot of what was loaded.
#[derive(Debug)]
enum StoreState {
    /// No mutation has been requested yet.
    Pristine(Entries),
    /// A mutation has been requested. We hold both the loaded snapshot
    /// and the current entries.
    Dirty { original: Entries, current: Entries },
}

/// The set of active instances, loaded at start and written once at the end of a run.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: StoreState,
}

/// Parses `KEY=VALUE` lines, splitting on the first `=`. Malformed lines are ignored.
pub fn parse_entries(content: &str) -> Entries {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                log::debug!("Ignoring malformed state line '{}'", line);
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

impl StateStore {
    /// Creates an in-memory store that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>, entries: Entries) -> Self {
        Self {
            path: path.into(),
            state: StoreState::Pristine(entries),
        }
    }

    /// Loads the store from `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let entries = match fs::read_to_string(path) {
            Ok(content) => parse_entries(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No state file at '{}', starting empty", path.display());
                Entries::new()
            }
            Err(source) => {
                return Err(StateError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        log::debug!("Loaded {} state entr(ies) from '{}'", entries.len(), path.display());
        Ok(Self::new(path, entries))
    }

    /// Where the store is persisted.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only access to the current entries.
    pub fn entries(&self) -> &Entries {
        match &self.state {
            StoreState::Pristine(entries) => entries,
            StoreState::Dirty { current, .. } => current,
        }
    }

    /// The logical name recorded for an instance.
    pub fn get(&self, instance: &str) -> Option<&str> {
        self.entries().get(instance).map(String::as_str)
    }

    /// Records `instance` as active under `logical`.
    pub fn insert(&mut self, instance: &str, logical: &str) {
        self.entries_mut()
            .insert(instance.to_string(), logical.to_string());
    }

    /// Forgets `instance`, returning its logical name.
    pub fn remove(&mut self, instance: &str) -> Option<String> {
        self.entries_mut().remove(instance)
    }

    /// Checks whether the entries differ from what was loaded.
    pub fn needs_saving(&self) -> bool {
        match &self.state {
            StoreState::Pristine(_) => false,
            StoreState::Dirty { original, current } => original != current,
        }
    }

    /// Serializes the entries, one `instance=logical` line each, sorted by instance.
    pub fn render(&self) -> String {
        self.entries()
            .iter()
            .map(|(instance, logical)| format!("{instance}={logical}\n"))
            .collect()
    }

    /// Rewrites the whole state file through a temporary file in the same directory.
    pub fn persist(&self) -> Result<(), StateError> {
        let write_err = |source| StateError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(write_err)?;

        let mut temp = NamedTempFile::new_in(&parent).map_err(write_err)?;
        temp.write_all(self.render().as_bytes()).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.persist(&self.path).map_err(|e| write_err(e.error))?;

        log::debug!(
            "Persisted {} state entr(ies) to '{}'",
            self.entries().len(),
            self.path.display()
        );
        Ok(())
    }

    /// Hands out mutable entries, moving from Pristine to Dirty on first use.
    fn entries_mut(&mut self) -> &mut Entries {
        if let StoreState::Pristine(entries) = &mut self.state {
            let loaded = std::mem::take(entries);
            self.state = StoreState::Dirty {
                original: loaded.clone(),
                current: loaded,
            };
        }

        match &mut self.state {
            StoreState::Dirty { current, .. } => current,
            StoreState::Pristine(entries) => entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_entries_ignores_malformed_lines() {
        let entries = parse_entries("eth0=eth0\ngarbage\nwlan0=home=office\n=nokey\nbr0=\n");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["eth0"], "eth0");
        assert_eq!(entries["wlan0"], "home=office");
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::load(&dir.path().join("absent")).unwrap();
        assert!(store.entries().is_empty());
        assert!(!store.needs_saving());
    }

    #[test]
    fn test_mutations_mark_store_dirty_only_when_changed() {
        let mut store = StateStore::new("/unused", parse_entries("eth0=eth0\n"));
        store.insert("eth0", "eth0");
        assert!(!store.needs_saving());

        store.insert("br0", "bridge");
        assert!(store.needs_saving());
        store.remove("br0");
        assert!(!store.needs_saving());

        store.remove("eth0");
        assert!(store.needs_saving());
        assert_eq!(store.get("eth0"), None);
    }

    #[test]
    fn test_persist_round_trips_and_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run").join("state");

        let mut store = StateStore::load(&path).unwrap();
        store.insert("wlan0", "home");
        store.insert("eth0", "eth0");
        store.persist().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "eth0=eth0\nwlan0=home\n");
        let reloaded = StateStore::load(&path).unwrap();
        assert_eq!(reloaded.get("wlan0"), Some("home"));
    }
}
