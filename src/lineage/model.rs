//! Lineage result types

use std::fmt;

use serde::Serialize;

use super::aggregator::ReferenceSet;
use crate::error::ParseError;

/// Operation a statement applies to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum OperationType {
    Read,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Read => "Read",
            OperationType::Insert => "Insert",
            OperationType::Update => "Update",
            OperationType::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// Column-level lineage entry. Not populated yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnReference {
    pub column_name: String,
    pub operation: OperationType,
}

/// A table touched by the script and the operation applied to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReference {
    /// `schema.table` or a bare table name, trimmed and lowercase
    pub table_name: String,
    /// Alias the table was referenced under, if any
    pub alias: Option<String>,
    pub operation: OperationType,
    pub column_references: Vec<ColumnReference>,
}

impl TableReference {
    /// Build a reference; the name must already be normalized.
    pub(crate) fn new(table_name: String, operation: OperationType, alias: Option<&str>) -> Self {
        Self {
            table_name,
            alias: alias.map(str::to_string),
            operation,
            column_references: Vec::new(),
        }
    }
}

/// Lineage of one analyzed script.
///
/// Lists only grow through the aggregator entry points
/// ([`ParseResult::add_table_if_absent`], [`ParseResult::add_tables`],
/// [`ParseResult::add_procedure_if_absent`]), so they never hold duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    pub(super) procedure_name: Option<String>,
    pub(super) procedures_invoked: Vec<String>,
    pub(super) table_references: ReferenceSet,
    pub(super) has_dynamic_sql: bool,
    pub(super) dynamic_sql_fragments: Vec<String>,
    pub(super) parsing_error: Option<String>,
    pub(super) parse_errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result of a script that failed to parse: only the errors are set.
    ///
    /// [`parsing_error`](Self::parsing_error) joins the messages with `,`; the
    /// positions stay available through [`parse_errors`](Self::parse_errors).
    pub fn from_parse_errors(errors: &[ParseError]) -> Self {
        let detail = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            parsing_error: Some(detail),
            parse_errors: errors.to_vec(),
            ..Self::default()
        }
    }

    /// Name of the first CREATE/ALTER PROCEDURE in the script.
    pub fn procedure_name(&self) -> Option<&str> {
        self.procedure_name.as_deref()
    }

    /// Procedures invoked through EXECUTE, in discovery order.
    pub fn procedures_invoked(&self) -> &[String] {
        &self.procedures_invoked
    }

    pub fn table_references(&self) -> &ReferenceSet {
        &self.table_references
    }

    pub fn has_dynamic_sql(&self) -> bool {
        self.has_dynamic_sql
    }

    /// Literal string arguments of `EXEC (...)` calls.
    pub fn dynamic_sql_fragments(&self) -> &[String] {
        &self.dynamic_sql_fragments
    }

    pub fn parsing_error(&self) -> Option<&str> {
        self.parsing_error.as_deref()
    }

    /// Syntax errors in script order, with their positions.
    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    pub fn has_parsing_error(&self) -> bool {
        self.parsing_error
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty())
    }

    // ========================================================================
    // Extractor-only mutation
    // ========================================================================

    pub(crate) fn set_procedure_name_if_absent(&mut self, name: String) {
        if self.procedure_name.is_none() {
            self.procedure_name = Some(name);
        }
    }

    pub(crate) fn mark_dynamic_sql(&mut self) {
        self.has_dynamic_sql = true;
    }

    pub(crate) fn push_dynamic_sql_fragment(&mut self, fragment: String) {
        self.dynamic_sql_fragments.push(fragment);
    }
}
