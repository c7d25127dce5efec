//! Common table expressions are flattened to the base tables they read

use pretty_assertions::assert_eq;
use tsql_lineage::OperationType::{Delete, Read, Update};

use crate::common::{analyze, assert_parsed, entries, entry};

#[test]
fn test_cte_name_is_replaced_by_base_tables() {
    let result = analyze("WITH recent AS (SELECT id FROM dbo.Orders) SELECT * FROM recent");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.orders", Read, None)]);
}

#[test]
fn test_chained_ctes_flatten_transitively() {
    let result = analyze(
        "WITH cte1 AS (SELECT id FROM base1), \
              cte2 AS (SELECT id FROM cte1 UNION ALL SELECT id FROM base2) \
         SELECT * FROM cte2",
    );
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![entry("base1", Read, None), entry("base2", Read, None)]
    );
}

#[test]
fn test_cte_names_never_reach_the_result() {
    let result = analyze(
        "WITH a AS (SELECT id FROM dbo.X), b AS (SELECT id FROM a) \
         SELECT * FROM b JOIN dbo.Y y ON y.id = b.id",
    );
    assert_parsed(&result);
    let names: Vec<String> = entries(&result).into_iter().map(|e| e.0).collect();
    assert_eq!(names, vec!["dbo.y", "dbo.x"]);
}

#[test]
fn test_recursive_cte_drops_self_reference() {
    let result = analyze(
        "WITH tree AS ( \
             SELECT id FROM dbo.Nodes WHERE parent IS NULL \
             UNION ALL \
             SELECT n.id FROM dbo.Nodes n JOIN tree t ON n.parent = t.id \
         ) SELECT * FROM tree",
    );
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.nodes", Read, None)]);
}

#[test]
fn test_update_through_cte_writes_base_table() {
    let result = analyze(
        "WITH pending AS (SELECT id, status FROM dbo.Orders WHERE status = 0) \
         UPDATE pending SET status = 1",
    );
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.orders", Update, None)]);
}

#[test]
fn test_delete_joined_with_cte() {
    let result = analyze(
        "WITH old AS (SELECT id FROM dbo.Archive) \
         DELETE o FROM dbo.Orders o JOIN old ON old.id = o.id",
    );
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![
            entry("dbo.orders", Delete, Some("o")),
            entry("dbo.archive", Read, None),
        ]
    );
}

#[test]
fn test_cte_scope_ends_with_its_statement() {
    let result = analyze(
        "WITH staged AS (SELECT id FROM dbo.Source) SELECT * FROM staged; \
         SELECT * FROM staged",
    );
    assert_parsed(&result);
    assert_eq!(
        entries(&result),
        vec![entry("dbo.source", Read, None), entry("staged", Read, None)]
    );
}
