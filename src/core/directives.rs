//! # Directive Processor
//!
//! Reads logical lines from a stack of file segments and applies the
//! preprocessing directives before anything reaches the tree builder:
//!
//! - `include PATH` pushes a file (or one segment per file of a directory).
//! - `define IDENT [VALUE]` / `undef IDENT` edit the global define table.
//! - `ifdef IDENT` / `ifndef IDENT` guard every deeper line that follows them.
//! - `%IDENT%` in any other line is replaced by its definition, `%%` by `%`.
//!
//! Directive lines are consumed. Lines inside an active condition are lifted by
//! one level per condition, so conditionals never show up as nesting.

use crate::core::{
    indentation::IndentStack,
    parser::{Location, ParseError},
    reader::{self, LogicalLine},
    words,
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

lazy_static! {
    static ref IDENT_RE: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9_.]*$").expect("identifier pattern is valid");
    // `%%` captures an empty key and collapses to a literal `%`.
    static ref SUBST_RE: Regex = Regex::new(r"%([^%\s]*)%").expect("substitution pattern is valid");
}

/// A line that survived preprocessing, ready for the tree builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Nesting level within its file.
    pub level: usize,
    /// Text after substitution, without indentation.
    pub content: String,
    /// Where the line starts.
    pub location: Location,
}

#[derive(Debug, Clone, Copy)]
struct Condition {
    level: usize,
    enabled: bool,
}

/// One file being (or waiting to be) read.
#[derive(Debug)]
struct Segment {
    path: PathBuf,
    /// Level of the line that included this file; added to every local level.
    offset: usize,
    indent: IndentStack,
    /// `None` until the segment reaches the top of the stack and is opened.
    lines: Option<std::vec::IntoIter<LogicalLine>>,
    /// Key in the active file set, set once opened.
    key: Option<PathBuf>,
    site: Option<Location>,
}

impl Segment {
    fn pending(path: PathBuf, offset: usize, site: Option<Location>) -> Self {
        Self {
            path,
            offset,
            indent: IndentStack::new(),
            lines: None,
            key: None,
            site,
        }
    }
}

/// Streams preprocessed lines out of a root file and its includes.
#[derive(Debug)]
pub struct Preprocessor {
    defines: HashMap<String, String>,
    conditions: Vec<Condition>,
    segments: Vec<Segment>,
    /// Files currently open somewhere on the segment stack.
    active: HashSet<PathBuf>,
}

impl Preprocessor {
    /// Starts reading at `path`; the file is opened on the first call to [`Self::next_line`].
    pub fn open(path: &Path) -> Self {
        Self {
            defines: HashMap::new(),
            conditions: Vec::new(),
            segments: vec![Segment::pending(path.to_path_buf(), 0, None)],
            active: HashSet::new(),
        }
    }

    /// Starts reading from in-memory source attributed to `path`.
    pub fn from_source(path: &Path, source: &str) -> Self {
        let key = file_key(path);
        let mut segment = Segment::pending(path.to_path_buf(), 0, None);
        segment.lines = Some(reader::logical_lines(source).into_iter());
        segment.key = Some(key.clone());

        Self {
            defines: HashMap::new(),
            conditions: Vec::new(),
            segments: vec![segment],
            active: HashSet::from([key]),
        }
    }

    /// Current value of a define, if any.
    pub fn define(&self, ident: &str) -> Option<&str> {
        self.defines.get(ident).map(String::as_str)
    }

    /// Returns the next line that is not a directive and not disabled by a condition.
    pub fn next_line(&mut self) -> Result<Option<RawLine>, ParseError> {
        loop {
            let Some(segment) = self.segments.last_mut() else {
                return Ok(None);
            };

            let Some(lines) = segment.lines.as_mut() else {
                self.open_top()?;
                continue;
            };

            let Some(logical) = lines.next() else {
                self.close_top();
                continue;
            };

            let location = Location::new(segment.path.clone(), logical.number);
            let local_level = segment
                .indent
                .level_for(logical.width)
                .ok_or_else(|| ParseError::Indentation {
                    location: location.clone(),
                })?;
            let level = segment.offset + local_level;

            while self.conditions.last().is_some_and(|c| c.level >= level) {
                self.conditions.pop();
            }
            if self.conditions.last().is_some_and(|c| !c.enabled) {
                log::trace!("{}: skipped by condition", location);
                continue;
            }

            let keyword = logical.text.split_whitespace().next().unwrap_or_default();
            match keyword {
                "include" => self.include(&logical.text, level, location)?,
                "define" => self.define_directive(&logical.text, location)?,
                "undef" => self.undef_directive(&logical.text, location)?,
                "ifdef" | "ifndef" => self.condition_directive(&logical.text, level, location)?,
                _ => {
                    let content = self.substitute(&logical.text, &location)?;
                    let level = level.saturating_sub(self.conditions.len());
                    log::trace!("{}: level {} '{}'", location, level, content);
                    return Ok(Some(RawLine {
                        level,
                        content,
                        location,
                    }));
                }
            }
        }
    }

    fn open_top(&mut self) -> Result<(), ParseError> {
        let Some(segment) = self.segments.last_mut() else {
            return Ok(());
        };

        let key = file_key(&segment.path);
        if self.active.contains(&key) {
            let site = segment
                .site
                .clone()
                .unwrap_or_else(|| Location::new(segment.path.clone(), 0));
            return Err(ParseError::RecursiveInclude {
                path: segment.path.clone(),
                site,
            });
        }

        let source = fs::read_to_string(&segment.path).map_err(|source| ParseError::Io {
            path: segment.path.clone(),
            source,
        })?;
        log::debug!("Reading '{}' at offset {}", segment.path.display(), segment.offset);

        segment.lines = Some(reader::logical_lines(&source).into_iter());
        segment.key = Some(key.clone());
        self.active.insert(key);
        Ok(())
    }

    fn close_top(&mut self) {
        if let Some(segment) = self.segments.pop()
            && let Some(key) = segment.key
        {
            self.active.remove(&key);
        }
    }

    fn include(&mut self, text: &str, level: usize, location: Location) -> Result<(), ParseError> {
        let words = split_directive(text, &location)?;
        let operand = single_operand(&words, "include", "a path", &location)?;

        let base = location
            .file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let target = base.join(operand);

        if target.is_file() {
            self.segments
                .push(Segment::pending(target, level, Some(location)));
            return Ok(());
        }

        if target.is_dir() {
            let members = directory_members(&target).map_err(|source| ParseError::Io {
                path: target.clone(),
                source,
            })?;
            log::debug!(
                "{}: including {} file(s) from '{}'",
                location,
                members.len(),
                target.display()
            );
            // Reverse order so popping the stack reads members ascending.
            for member in members.into_iter().rev() {
                self.segments
                    .push(Segment::pending(member, level, Some(location.clone())));
            }
            return Ok(());
        }

        Err(ParseError::IncludeNotFound {
            path: target,
            location,
        })
    }

    fn define_directive(&mut self, text: &str, location: Location) -> Result<(), ParseError> {
        let words = split_directive(text, &location)?;
        let (ident, value) = match words.as_slice() {
            [_] => {
                return Err(ParseError::MissingOperand {
                    keyword: "define".to_string(),
                    expected: "an identifier",
                    location,
                });
            }
            [_, ident] => (ident, "1".to_string()),
            [_, ident, value] => (ident, value.clone()),
            _ => {
                return Err(ParseError::TooManyOperands {
                    keyword: "define".to_string(),
                    location,
                });
            }
        };
        check_identifier(ident, &location)?;
        log::trace!("{}: define {}={}", location, ident, value);
        self.defines.insert(ident.clone(), value);
        Ok(())
    }

    fn undef_directive(&mut self, text: &str, location: Location) -> Result<(), ParseError> {
        let words = split_directive(text, &location)?;
        let ident = single_operand(&words, "undef", "an identifier", &location)?;
        check_identifier(ident, &location)?;
        self.defines.remove(ident);
        Ok(())
    }

    fn condition_directive(
        &mut self,
        text: &str,
        level: usize,
        location: Location,
    ) -> Result<(), ParseError> {
        let words = split_directive(text, &location)?;
        let keyword = words.first().map(String::as_str).unwrap_or_default();
        let ident = single_operand(&words, keyword, "an identifier", &location)?;
        check_identifier(ident, &location)?;

        let defined = self.defines.contains_key(ident);
        let enabled = if keyword == "ifdef" { defined } else { !defined };
        log::trace!("{}: {} {} -> {}", location, keyword, ident, enabled);
        self.conditions.push(Condition { level, enabled });
        Ok(())
    }

    fn substitute(&self, text: &str, location: &Location) -> Result<String, ParseError> {
        if !text.contains('%') {
            return Ok(text.to_string());
        }

        let mut missing: Option<String> = None;
        let replaced = SUBST_RE.replace_all(text, |caps: &Captures<'_>| {
            let key = caps.get(1).map_or("", |m| m.as_str());
            if key.is_empty() {
                return "%".to_string();
            }
            match self.defines.get(key) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| key.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(key) => Err(ParseError::UnknownSubstitution {
                key,
                location: location.clone(),
            }),
            None => Ok(replaced.into_owned()),
        }
    }
}

/// Identity used for recursion detection: the canonical path when it exists.
fn file_key(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Immediate regular files of a directory, sorted by name, skipping hidden and backup files.
fn directory_members(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut members = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || name.ends_with('~') {
            continue;
        }
        if entry.path().is_file() {
            members.push(entry.into_path());
        }
    }
    Ok(members)
}

fn split_directive(text: &str, location: &Location) -> Result<Vec<String>, ParseError> {
    words::split(text).map_err(|source| ParseError::Words {
        source,
        location: location.clone(),
    })
}

fn single_operand<'w>(
    words: &'w [String],
    keyword: &str,
    expected: &'static str,
    location: &Location,
) -> Result<&'w str, ParseError> {
    match words {
        [_, operand] => Ok(operand.as_str()),
        [] | [_] => Err(ParseError::MissingOperand {
            keyword: keyword.to_string(),
            expected,
            location: location.clone(),
        }),
        _ => Err(ParseError::TooManyOperands {
            keyword: keyword.to_string(),
            location: location.clone(),
        }),
    }
}

fn check_identifier(ident: &str, location: &Location) -> Result<(), ParseError> {
    if IDENT_RE.is_match(ident) {
        Ok(())
    } else {
        Err(ParseError::InvalidIdentifier {
            ident: ident.to_string(),
            location: location.clone(),
        })
    }
}
