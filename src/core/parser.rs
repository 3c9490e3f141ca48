//! # Parser
//!
//! Entry points turning interface definition files into a forest of [`ConfigLine`]s.
//!
//! The work is split across small stages that run interleaved:
//!
//! - **`reader`** merges continued physical lines and drops blanks and comments.
//! - **`indentation`** maps leading whitespace to a nesting level per file.
//! - **`directives`** handles `include`, `define`, `undef`, `ifdef`, `ifndef` and
//!   `%name%` substitution, feeding the surviving lines onward.
//! - **`tree`** attaches every line to its parent.
//!
//! Word splitting (`words`) happens lazily, only when a line's words are asked for.

use crate::core::{directives::Preprocessor, tree};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use crate::core::tree::ConfigLine;

/// A position in a configuration file, shown as `file:line`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// The file as it was opened.
    pub file: PathBuf,
    /// 1-based physical line number.
    pub line: usize,
}

impl Location {
    /// Creates a location.
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Fatal errors raised while parsing or while building the model.
/// Any of them aborts the run before a single hook is invoked.
#[derive(Error, Debug)]
pub enum ParseError {
    /// A configuration file could not be read.
    #[error("Could not read '{path}': {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A file was included while it was still being read.
    #[error("{site}: recursive include of '{path}'")]
    RecursiveInclude {
        /// The file involved.
        path: PathBuf,
        /// The `include` line.
        site: Location,
    },
    /// An `include` operand is neither a file nor a directory.
    #[error("{location}: include target '{path}' is neither a file nor a directory")]
    IncludeNotFound {
        /// The file involved.
        path: PathBuf,
        /// Where the problem was found.
        location: Location,
    },
    /// Indentation does not match any enclosing level.
    #[error("{location}: invalid indentation")]
    Indentation {
        /// Where the problem was found.
        location: Location,
    },
    /// A line is nested more than one level below its predecessor.
    #[error("{location}: unexpected nesting (no enclosing line at the level above)")]
    UnexpectedNesting {
        /// Where the problem was found.
        location: Location,
    },
    /// Quoting or escaping problem in a line's words.
    #[error("{location}: {source}")]
    Words {
        /// The underlying error.
        #[source]
        source: crate::core::words::WordError,
        /// Where the problem was found.
        location: Location,
    },
    /// A `define`/`undef`/`ifdef`/`ifndef` operand is not a valid identifier.
    #[error("{location}: invalid identifier '{ident}'")]
    InvalidIdentifier {
        /// The rejected identifier.
        ident: String,
        /// Where the problem was found.
        location: Location,
    },
    /// `%name%` used with no definition for `name`.
    #[error("{location}: unknown substitution key '{key}'")]
    UnknownSubstitution {
        /// The key as written.
        key: String,
        /// Where the problem was found.
        location: Location,
    },
    /// A directive or keyword is missing an operand.
    #[error("{location}: '{keyword}' requires {expected}")]
    MissingOperand {
        /// The keyword of the line.
        keyword: String,
        /// What the keyword needs.
        expected: &'static str,
        /// Where the problem was found.
        location: Location,
    },
    /// A directive or keyword has more operands than it accepts.
    #[error("{location}: too many operands for '{keyword}'")]
    TooManyOperands {
        /// The keyword of the line.
        keyword: String,
        /// Where the problem was found.
        location: Location,
    },
    /// A line starts with a word that is not valid in its position.
    #[error("{location}: unknown keyword '{keyword}'{context}")]
    UnknownKeyword {
        /// The keyword of the line.
        keyword: String,
        /// Where the keyword appeared, for the message.
        context: String,
        /// Where the problem was found.
        location: Location,
    },
    /// An interface, group or mapping name is declared twice.
    #[error("{location}: duplicate {kind} '{name}' (first defined at {first})")]
    Duplicate {
        /// What was duplicated.
        kind: &'static str,
        /// The duplicated name.
        name: String,
        /// Where the name was first defined.
        first: Location,
        /// Where the problem was found.
        location: Location,
    },
    /// Two options of one definition produce the same environment key.
    #[error("{location}: option '{option}' collides with environment key '{key}'")]
    EnvKeyCollision {
        /// The option as written.
        option: String,
        /// The environment key it maps to.
        key: String,
        /// Where the problem was found.
        location: Location,
    },
    /// A line carries sublines where none are allowed.
    #[error("{location}: '{keyword}' does not take an indented block")]
    UnexpectedBlock {
        /// The keyword of the line.
        keyword: String,
        /// Where the problem was found.
        location: Location,
    },
}

/// Parses a configuration file and everything it includes.
pub fn parse_file(path: &Path) -> Result<Vec<ConfigLine>, ParseError> {
    log::debug!("Parsing configuration file '{}'", path.display());
    let mut preprocessor = Preprocessor::open(path);
    tree::build_forest(&mut preprocessor)
}

/// Parses in-memory source as if it had been read from `path`.
/// Relative includes resolve against the parent directory of `path`.
pub fn parse_source(path: &Path, source: &str) -> Result<Vec<ConfigLine>, ParseError> {
    let mut preprocessor = Preprocessor::from_source(path, source);
    tree::build_forest(&mut preprocessor)
}
