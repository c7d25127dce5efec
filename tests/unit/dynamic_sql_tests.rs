//! EXECUTE of string batches

use pretty_assertions::assert_eq;

use crate::common::{analyze, assert_parsed};

#[test]
fn test_exec_variable_sets_flag_only() {
    let result = analyze("DECLARE @sql NVARCHAR(MAX) = N'SELECT 1' EXEC(@sql)");
    assert_parsed(&result);
    assert!(result.has_dynamic_sql());
    assert!(result.dynamic_sql_fragments().is_empty());
    assert!(result.procedures_invoked().is_empty());
}

#[test]
fn test_exec_literal_records_fragment() {
    let result = analyze("EXEC('SELECT 1 FROM x')");
    assert_parsed(&result);
    assert!(result.has_dynamic_sql());
    assert_eq!(result.dynamic_sql_fragments(), ["SELECT 1 FROM x".to_string()]);
    assert!(
        result.table_references().is_empty(),
        "dynamic SQL text is not analyzed"
    );
}

#[test]
fn test_exec_concatenation_keeps_literal_parts() {
    let result = analyze("EXECUTE ('SELECT * FROM ' + @table + N' WHERE id = 1')");
    assert_parsed(&result);
    assert_eq!(
        result.dynamic_sql_fragments(),
        ["SELECT * FROM ".to_string(), " WHERE id = 1".to_string()]
    );
}

#[test]
fn test_repeated_fragments_are_appended() {
    let result = analyze("EXEC ('TRUNCATE TABLE t'); EXEC ('TRUNCATE TABLE t');");
    assert_parsed(&result);
    assert_eq!(result.dynamic_sql_fragments().len(), 2);
}

#[test]
fn test_sp_executesql_is_a_procedure_call() {
    let result = analyze("EXEC sp_executesql N'SELECT * FROM dbo.Orders'");
    assert_parsed(&result);
    assert!(!result.has_dynamic_sql());
    assert_eq!(result.procedures_invoked(), ["sp_executesql".to_string()]);
}
