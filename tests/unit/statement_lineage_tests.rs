//! Lineage of individual statements: reads, writes, aliases and procedures

use pretty_assertions::assert_eq;
use tsql_lineage::OperationType::{Delete, Insert, Read, Update};

use crate::common::{analyze, assert_parsed, entries, entry};

// ============================================================================
// SELECT and DECLARE
// ============================================================================

#[test]
fn test_select_assignment_join_reads_both_tables() {
    let result = analyze(
        "DECLARE @v INT SELECT @v = col FROM table1 t1 INNER JOIN table2 t2 ON t1.id = t2.t1id",
    );
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![
            entry("table2", Read, Some("t2")),
            entry("table1", Read, Some("t1")),
        ]
    );
    assert!(result.procedures_invoked().is_empty());
}

#[test]
fn test_declare_initializer_subquery_reads_tables() {
    let result = analyze(
        "DECLARE @v INT = (SELECT col FROM table1 t1 INNER JOIN table2 t2 ON t1.id = t2.t1id);",
    );
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![
            entry("table2", Read, Some("t2")),
            entry("table1", Read, Some("t1")),
        ]
    );
}

#[test]
fn test_declare_without_subquery_reads_nothing() {
    let result = analyze("DECLARE @a INT = 5, @b NVARCHAR(10) = N'x', @t TABLE (id INT)");
    assert_parsed(&result);
    assert!(result.table_references().is_empty());
}

#[test]
fn test_names_are_trimmed_and_lowercased() {
    let result = analyze("SELECT * FROM [DBO].[Orders] O; SELECT * FROM dbo.orders");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.orders", Read, Some("O"))]);
}

#[test]
fn test_select_list_subquery_follows_from_clause() {
    let result = analyze("SELECT a.id, (SELECT MAX(b.id) FROM dbo.B b) AS m FROM dbo.A a");
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![entry("dbo.a", Read, Some("a")), entry("dbo.b", Read, Some("b"))]
    );
}

#[test]
fn test_union_reads_both_sides_in_order() {
    let result = analyze("SELECT id FROM dbo.A UNION ALL SELECT id FROM dbo.B EXCEPT SELECT id FROM dbo.C");
    assert_parsed(&result);
    let names: Vec<String> = entries(&result).into_iter().map(|e| e.0).collect();
    assert_eq!(names, vec!["dbo.a", "dbo.b", "dbo.c"]);
}

#[test]
fn test_derived_table_relabels_inner_tables() {
    let result = analyze("SELECT d.id FROM (SELECT x.id FROM dbo.A x) d");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.a", Read, Some("d"))]);
}

#[test]
fn test_table_variable_source_is_read() {
    let result = analyze("DECLARE @items TABLE (id INT) SELECT i.id FROM @items i");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("@items", Read, Some("i"))]);
}

#[test]
fn test_select_into_target_is_not_recorded() {
    let result = analyze("SELECT * INTO #tmp FROM dbo.Orders");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.orders", Read, None)]);
}

#[test]
fn test_three_part_names_are_skipped() {
    let result = analyze("SELECT * FROM otherdb.dbo.Orders");
    assert_parsed(&result);
    assert!(result.table_references().is_empty());
}

// ============================================================================
// INSERT
// ============================================================================

#[test]
fn test_insert_select() {
    let result = analyze("INSERT INTO dbo.Target (a) SELECT s.a FROM dbo.Source s");
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![
            entry("dbo.target", Insert, None),
            entry("dbo.source", Read, Some("s")),
        ]
    );
}

#[test]
fn test_insert_values_into_table_variable() {
    let result = analyze("DECLARE @log TABLE (id INT) INSERT @log (id) VALUES (1), (2)");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("@log", Insert, None)]);
}

#[test]
fn test_insert_exec_invokes_procedure() {
    let result = analyze("INSERT INTO #t EXEC dbo.usp_Get @id = 1");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("#t", Insert, None)]);
    assert_eq!(result.procedures_invoked(), ["dbo.usp_get".to_string()]);
}

// ============================================================================
// UPDATE and DELETE
// ============================================================================

#[test]
fn test_update_plain_target() {
    let result = analyze("UPDATE dbo.Orders SET status = 1 WHERE id = 2");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.orders", Update, None)]);
}

#[test]
fn test_update_through_from_alias() {
    let result = analyze(
        "UPDATE o SET o.status = s.status FROM dbo.Orders o JOIN dbo.Staging s ON s.id = o.id",
    );
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![
            entry("dbo.orders", Update, Some("o")),
            entry("dbo.staging", Read, Some("s")),
        ]
    );
}

#[test]
fn test_update_set_subquery_reads_tables() {
    let result = analyze("UPDATE dbo.Orders SET total = (SELECT SUM(amount) FROM dbo.Lines)");
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![entry("dbo.orders", Update, None), entry("dbo.lines", Read, None)]
    );
}

#[test]
fn test_update_self_join_keeps_other_alias_read() {
    let result = analyze("UPDATE a SET a.x = b.x FROM dbo.T a JOIN dbo.T b ON a.parent = b.id");
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![entry("dbo.t", Update, Some("a")), entry("dbo.t", Read, Some("b"))]
    );
}

#[test]
fn test_delete_through_from_alias() {
    let result = analyze("DELETE t1 FROM table1 t1 INNER JOIN table2 t2 ON t1.id = t2.t1id");
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![
            entry("table1", Delete, Some("t1")),
            entry("table2", Read, Some("t2")),
        ]
    );
}

#[test]
fn test_update_after_set_option_without_semicolon() {
    let result = analyze("SET NOCOUNT ON\nUPDATE orders SET a = 1");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("orders", Update, None)]);
}

#[test]
fn test_delete_after_set_option_without_semicolon() {
    let result = analyze("SET NOCOUNT ON\nDELETE FROM orders WHERE id = 1");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("orders", Delete, None)]);

    let result = analyze("SET XACT_ABORT ON\nDELETE o FROM orders o JOIN x ON x.id = o.id");
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![entry("orders", Delete, Some("o")), entry("x", Read, None)]
    );
}

#[test]
fn test_procedure_body_after_set_option() {
    let result = analyze(
        "CREATE PROCEDURE dbo.p AS\nSET NOCOUNT ON\nUPDATE orders SET a = 1\nSET XACT_ABORT ON\nDELETE FROM history",
    );
    assert_parsed(&result);
    assert_eq!(result.procedure_name(), Some("dbo.p"));
    assert_eq!(
        entries(&result),
        vec![entry("orders", Update, None), entry("history", Delete, None)]
    );
}

#[test]
fn test_update_through_derived_table_alias() {
    let result = analyze("UPDATE x SET a = 1 FROM (SELECT * FROM t1 t) x");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("t1", Update, Some("x"))]);
}

#[test]
fn test_delete_through_derived_table_alias_keeps_other_reads() {
    let result = analyze(
        "DELETE d FROM (SELECT id FROM dbo.Queue WHERE done = 0) d JOIN dbo.Done n ON n.id = d.id",
    );
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![
            entry("dbo.queue", Delete, Some("d")),
            entry("dbo.done", Read, Some("n")),
        ]
    );
}

#[test]
fn test_delete_plain_target() {
    let result = analyze("DELETE FROM dbo.Orders WHERE id = 1");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.orders", Delete, None)]);
}

// ============================================================================
// MERGE
// ============================================================================

#[test]
fn test_merge_target_is_inserted_and_updated() {
    let result = analyze(
        "MERGE INTO orders AS t USING staging AS s ON t.id = s.id \
         WHEN MATCHED THEN UPDATE SET t.qty = s.qty \
         WHEN NOT MATCHED THEN INSERT (id, qty) VALUES (s.id, s.qty);",
    );
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![
            entry("orders", Insert, Some("t")),
            entry("orders", Update, Some("t")),
            entry("staging", Read, Some("s")),
        ]
    );
}

#[test]
fn test_merge_derived_source_reads_inner_tables() {
    let result = analyze(
        "MERGE dbo.Totals t USING (SELECT id, SUM(v) v FROM dbo.Lines GROUP BY id) src ON t.id = src.id \
         WHEN MATCHED THEN DELETE;",
    );
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![
            entry("dbo.totals", Insert, Some("t")),
            entry("dbo.totals", Update, Some("t")),
            entry("dbo.lines", Read, Some("src")),
        ]
    );
}

// ============================================================================
// Control flow and procedures
// ============================================================================

#[test]
fn test_if_exists_predicate_is_read() {
    let result = analyze(
        "IF NOT EXISTS (SELECT 1 FROM dbo.Config WHERE k = 'x') INSERT INTO dbo.Config (k) VALUES ('x')",
    );
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![entry("dbo.config", Read, None), entry("dbo.config", Insert, None)]
    );
}

#[test]
fn test_if_else_branches_are_both_visited() {
    let result = analyze("IF @a = 1 DELETE FROM dbo.A; ELSE DELETE FROM dbo.B;");
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![entry("dbo.a", Delete, None), entry("dbo.b", Delete, None)]
    );
}

#[test]
fn test_while_body_is_visited() {
    let result = analyze(
        "WHILE EXISTS (SELECT 1 FROM dbo.Queue) BEGIN DELETE TOP (10) FROM dbo.Queue END",
    );
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.queue", Delete, None)]);
}

#[test]
fn test_try_and_catch_blocks_are_visited() {
    let result = analyze(
        "BEGIN TRY INSERT INTO dbo.A (id) VALUES (1) END TRY \
         BEGIN CATCH EXEC dbo.usp_LogError; THROW; END CATCH",
    );
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.a", Insert, None)]);
    assert_eq!(result.procedures_invoked(), ["dbo.usp_logerror".to_string()]);
}

#[test]
fn test_procedure_name_first_definition_wins() {
    let result = analyze(
        "CREATE PROCEDURE [dbo].[usp_A] AS SELECT 1\nGO\nCREATE PROCEDURE dbo.usp_B AS SELECT 2\nGO\n",
    );
    assert_parsed(&result);
    assert_eq!(result.procedure_name(), Some("dbo.usp_a"));
}

#[test]
fn test_procedures_invoked_are_deduplicated() {
    let result = analyze("EXEC dbo.usp_A; EXECUTE DBO.USP_A 1; EXEC usp_B; EXEC @proc");
    assert_parsed(&result);
    assert_eq!(
        result.procedures_invoked(),
        ["dbo.usp_a".to_string(), "usp_b".to_string()]
    );
}

#[test]
fn test_non_lineage_statements_contribute_nothing() {
    let result = analyze(
        "SET NOCOUNT ON; CREATE TABLE #t (id INT); BEGIN TRAN; PRINT 'x'; COMMIT; DROP TABLE #t;",
    );
    assert_parsed(&result);
    assert!(result.table_references().is_empty());
    assert!(result.procedures_invoked().is_empty());
    assert!(!result.has_dynamic_sql());
}

#[test]
fn test_analysis_is_deterministic() {
    let sql = "UPDATE o SET o.v = 1 FROM dbo.Orders o JOIN dbo.Lines l ON l.id = o.id; EXEC dbo.usp_A";
    assert_eq!(analyze(sql), analyze(sql));
}
