//! tsql-lineage: table and procedure level lineage for T-SQL scripts
//!
//! This library parses T-SQL scripts and reports which tables each script reads
//! and writes, which stored procedures it invokes, and the literal dynamic SQL
//! it executes, without running anything against a database.

pub mod ast;
pub mod error;
pub mod lineage;
pub mod parser;

use std::borrow::Cow;
use std::path::Path;

use encoding_rs::{Encoding, WINDOWS_1252};

pub use error::{LineageError, ParseError};
pub use lineage::{LineageExtractor, OperationType, ParseResult, TableReference};
pub use parser::SqlVersion;

/// Analyze a script's lineage.
///
/// Scripts that fail to parse yield a result with only
/// [`ParseResult::parsing_error`] set.
pub fn analyze(script: &str, version: SqlVersion) -> ParseResult {
    match parser::parse_script(script, version) {
        Ok(parsed) => LineageExtractor::new().extract(&parsed),
        Err(errors) => {
            tracing::debug!(errors = errors.len(), "script failed to parse");
            ParseResult::from_parse_errors(&errors)
        }
    }
}

/// Read a script file and analyze it.
pub fn analyze_file(path: &Path, version: SqlVersion) -> Result<ParseResult, LineageError> {
    let text = read_script(path)?;
    Ok(analyze(&text, version))
}

/// Read a script, honoring a UTF-8 or UTF-16 byte order mark.
///
/// Without a BOM the file is read as UTF-8, falling back to Windows-1252.
pub fn read_script(path: &Path) -> Result<String, LineageError> {
    let bytes = std::fs::read(path).map_err(|source| LineageError::ScriptReadError {
        path: path.to_path_buf(),
        source,
    })?;
    decode_script(&bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| LineageError::ScriptDecodeError {
            path: path.to_path_buf(),
        })
}

fn decode_script(bytes: &[u8]) -> Option<Cow<'_, str>> {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        return encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_length..]);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(Cow::Borrowed(text));
    }
    // Common for scripts saved by older Windows tools
    WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
}
