//! Error types for tsql-lineage

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// A syntax error reported while turning script text into a syntax tree.
///
/// Line and column are 1-based and absolute within the analyzed script,
/// even when the error was found in a later `GO` batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub message: String,
    pub line: u64,
    pub column: u64,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u64, column: u64) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Errors that can occur around an analysis call (never from the analysis itself)
#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Failed to read SQL script: {path}")]
    ScriptReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQL script is not valid text in a supported encoding: {path}")]
    ScriptDecodeError { path: PathBuf },

    #[error("Unknown SQL Server version '{value}' (expected one of 80, 90, 100, 110, 120, 130, 140)")]
    UnknownSqlVersion { value: String },
}
