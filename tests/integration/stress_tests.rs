//! Deeply nested control flow and very long join chains

use pretty_assertions::assert_eq;
use tsql_lineage::OperationType::{Read, Update};
use tsql_lineage::{analyze, SqlVersion};

use crate::common::{assert_parsed, entries, entry};

#[test]
fn test_nested_control_flow_reaches_innermost_statement() {
    let sql = r#"
CREATE PROCEDURE dbo.usp_Nested
AS
BEGIN
    BEGIN TRY
        WHILE @i < 10
        BEGIN
            IF @i % 2 = 0
                UPDATE q SET q.done = 1 FROM dbo.Queue q JOIN dbo.Work w ON w.id = q.id;
            ELSE
                EXEC dbo.usp_Skip @i;
            SET @i = @i + 1;
        END
    END TRY
    BEGIN CATCH
        SELECT ERROR_MESSAGE();
    END CATCH
END
"#;
    let result = analyze(sql, SqlVersion::default());
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![
            entry("dbo.queue", Update, Some("q")),
            entry("dbo.work", Read, Some("w")),
        ]
    );
    assert_eq!(result.procedures_invoked(), ["dbo.usp_skip".to_string()]);
}

#[test]
fn test_deeply_nested_blocks() {
    let depth = 50;
    let mut sql = String::new();
    for _ in 0..depth {
        sql.push_str("BEGIN\n");
    }
    sql.push_str("DELETE FROM dbo.Deep\n");
    for _ in 0..depth {
        sql.push_str("END\n");
    }

    let result = analyze(&sql, SqlVersion::default());
    assert_parsed(&result);
    assert_eq!(entries(&result).len(), 1);
}

#[test]
fn test_long_join_chain() {
    let tables = 2000;
    let mut sql = String::from("SELECT t0.id FROM dbo.T0 t0");
    for i in 1..tables {
        sql.push_str(&format!("\nJOIN dbo.T{i} t{i} ON t{i}.id = t{}.id", i - 1));
    }

    let result = analyze(&sql, SqlVersion::default());
    assert_parsed(&result);

    let references = result.table_references();
    assert_eq!(references.len(), tables);
    // Walk collects the right-hand side of each join first
    let first = references.iter().next().unwrap();
    assert_eq!(first.table_name, format!("dbo.t{}", tables - 1));
    let last = references.iter().last().unwrap();
    assert_eq!(last.table_name, "dbo.t0");
    assert!(references.iter().all(|r| r.operation == Read));
}

#[test]
fn test_long_update_join_chain() {
    let tables = 1000;
    let mut sql = String::from("UPDATE t0 SET t0.v = 1 FROM dbo.T0 t0");
    for i in 1..tables {
        sql.push_str(&format!(" LEFT JOIN dbo.T{i} t{i} ON t{i}.id = t0.id"));
    }

    let result = analyze(&sql, SqlVersion::default());
    assert_parsed(&result);
    assert_eq!(result.table_references().len(), tables);
    assert!(result.table_references().contains("dbo.t0", Update));
    assert!(!result.table_references().contains("dbo.t0", Read));
}
