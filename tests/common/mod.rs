//! Common test utilities for tsql-lineage tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tsql_lineage::{OperationType, ParseResult, SqlVersion};

/// Analyze `sql` with the default SQL Server version.
pub fn analyze(sql: &str) -> ParseResult {
    tsql_lineage::analyze(sql, SqlVersion::default())
}

/// `(table_name, operation, alias)` for each reference, in discovery order.
pub fn entries(result: &ParseResult) -> Vec<(String, OperationType, Option<String>)> {
    result
        .table_references()
        .iter()
        .map(|r| (r.table_name.clone(), r.operation, r.alias.clone()))
        .collect()
}

/// Shorthand for an expected [`entries`] row.
pub fn entry(
    table_name: &str,
    operation: OperationType,
    alias: Option<&str>,
) -> (String, OperationType, Option<String>) {
    (
        table_name.to_string(),
        operation,
        alias.map(str::to_string),
    )
}

/// Panic with the parser's message when `result` carries a parsing error.
pub fn assert_parsed(result: &ParseResult) {
    assert!(
        !result.has_parsing_error(),
        "Unexpected parsing error: {:?}",
        result.parsing_error()
    );
}

/// Test context with temporary directory for isolated test execution
pub struct TestContext {
    /// Kept to prevent temp directory cleanup until TestContext is dropped
    _temp_dir: TempDir,
    pub script_dir: PathBuf,
}

impl TestContext {
    /// Create a new test context by copying a fixture to a temp directory
    pub fn with_fixture(fixture_name: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(fixture_name);

        let script_dir = temp_dir.path().to_path_buf();
        copy_dir_recursive(&fixture_path, &script_dir).expect("Failed to copy fixture");

        Self {
            _temp_dir: temp_dir,
            script_dir,
        }
    }

    /// Create an empty context for scripts written by the test itself
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let script_dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            script_dir,
        }
    }

    pub fn script_path(&self, name: &str) -> PathBuf {
        self.script_dir.join(name)
    }

    /// Write raw bytes as a script and return its path
    pub fn write_script(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.script_path(name);
        fs::write(&path, bytes).expect("Failed to write script");
        path
    }

    /// Analyze a script of the context with the default SQL Server version
    pub fn analyze(&self, name: &str) -> ParseResult {
        tsql_lineage::analyze_file(&self.script_path(name), SqlVersion::default())
            .unwrap_or_else(|e| panic!("Failed to analyze {}: {}", name, e))
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)?;
    }

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
