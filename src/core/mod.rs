// src/core/mod.rs

//! Parsing, model building and orchestration.

pub mod compiler;
pub mod context;
pub mod directives;
pub mod engine;
pub mod environment;
pub mod indentation;
pub mod parser;
/// User path expansion.
pub mod paths;
/// Logical line reading.
pub mod reader;
/// The line tree built from preprocessed lines.
pub mod tree;
/// Word splitting with double quotes.
pub mod words;
