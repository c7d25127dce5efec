//! GO batches and parse failures

use pretty_assertions::assert_eq;
use tsql_lineage::OperationType::Read;

use crate::common::{analyze, assert_parsed, entries, entry};

#[test]
fn test_batches_share_one_result() {
    let result = analyze("SELECT * FROM dbo.A\nGO\nSELECT * FROM dbo.B\ngo;\nSELECT * FROM dbo.A\n");
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![entry("dbo.a", Read, None), entry("dbo.b", Read, None)]
    );
}

#[test]
fn test_parse_failure_short_circuits_lineage() {
    let result = analyze(
        "INSERT INTO dbo.A (id) SELECT id FROM dbo.B\nEXEC dbo.usp_Load\nEXEC ('x')\nGO\nSELECT 1\nEND\n",
    );
    assert!(result.has_parsing_error());
    assert!(result.table_references().is_empty());
    assert!(result.procedures_invoked().is_empty());
    assert!(result.dynamic_sql_fragments().is_empty());
    assert!(!result.has_dynamic_sql());
    assert!(result.procedure_name().is_none());
}

#[test]
fn test_error_messages_joined_and_positions_absolute() {
    let result = analyze("SELECT 1\nEND\nGO\nSELECT 2\nEND\n");
    assert_eq!(
        result.parsing_error(),
        Some("Incorrect syntax near 'END',Incorrect syntax near 'END'")
    );
    let positions: Vec<(u64, u64)> = result
        .parse_errors()
        .iter()
        .map(|e| (e.line, e.column))
        .collect();
    assert_eq!(positions, vec![(2, 1), (5, 1)]);
}

#[test]
fn test_go_inside_a_word_is_not_a_separator() {
    let result = analyze("SELECT * FROM dbo.Cargo\nSELECT * FROM dbo.GoLive");
    assert_parsed(&result);
    assert_eq!(result.table_references().len(), 2);
}

#[test]
fn test_empty_script() {
    let result = analyze("  \n-- nothing here\nGO\n");
    assert_parsed(&result);
    assert!(result.table_references().is_empty());
}
