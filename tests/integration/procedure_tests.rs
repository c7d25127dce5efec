//! Whole procedure scripts

use pretty_assertions::assert_eq;
use tsql_lineage::OperationType::{Delete, Insert, Read, Update};

use crate::common::{assert_parsed, entries, entry, TestContext};

#[test]
fn test_load_orders_procedure() {
    let ctx = TestContext::with_fixture("procedures");
    let result = ctx.analyze("usp_load_orders.sql");
    assert_parsed(&result);

    assert_eq!(result.procedure_name(), Some("dbo.usp_loadorders"));
    assert_eq!(
        entries(&result),
        vec![
            entry("dbo.orderarchive", Insert, None),
            entry("dbo.orders", Read, Some("o")),
            entry("dbo.customers", Update, Some("c")),
        ]
    );
    assert_eq!(
        result.procedures_invoked(),
        ["dbo.usp_audit".to_string(), "dbo.usp_logerror".to_string()]
    );
    assert!(!result.has_dynamic_sql());
}

#[test]
fn test_procedure_without_begin_end() {
    let ctx = TestContext::with_fixture("procedures");
    let result = ctx.analyze("nested/usp_purge.sql");
    assert_parsed(&result);

    assert_eq!(result.procedure_name(), Some("dbo.usp_purge"));
    assert_eq!(
        entries(&result),
        vec![
            entry("dbo.history", Delete, Some("h")),
            entry("dbo.orders", Read, Some("o")),
        ]
    );
}

#[test]
fn test_dynamic_sql_script() {
    let ctx = TestContext::with_fixture("dynamic");
    let result = ctx.analyze("rebuild.sql");
    assert_parsed(&result);

    assert!(result.has_dynamic_sql());
    assert_eq!(
        result.dynamic_sql_fragments(),
        ["TRUNCATE TABLE dbo.Staging".to_string()]
    );
    assert_eq!(result.procedures_invoked(), ["sp_executesql".to_string()]);
    assert!(result.table_references().is_empty());
}

#[test]
fn test_json_shape() {
    let ctx = TestContext::with_fixture("procedures");
    let result = ctx.analyze("nested/usp_purge.sql");
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["procedure_name"], "dbo.usp_purge");
    assert_eq!(json["table_references"][0]["table_name"], "dbo.history");
    assert_eq!(json["table_references"][0]["alias"], "h");
    assert_eq!(json["table_references"][0]["operation"], "Delete");
    assert_eq!(json["parsing_error"], serde_json::Value::Null);
}
