//! Plain-text report rendering

use pretty_assertions::assert_eq;

use crate::common::analyze;

#[test]
fn test_report_sorts_tables_and_lists_procedures() {
    let result = analyze(
        "UPDATE o SET o.v = 1 FROM dbo.Orders o JOIN dbo.Customers c ON c.id = o.cid; EXEC dbo.usp_Audit",
    );
    assert_eq!(
        result.to_string(),
        "Parsing Result ::\n\
         \tTables touched ::\n\
         \t\tdbo.customers - Read\n\
         \t\tdbo.orders - Update\n\
         \n\
         \tProcedures Invoked ::\n\
         \t\tdbo.usp_audit\n"
    );
}

#[test]
fn test_report_without_procedures() {
    let result = analyze("DELETE FROM dbo.Orders");
    assert_eq!(
        result.to_string(),
        "Parsing Result ::\n\tTables touched ::\n\t\tdbo.orders - Delete\n"
    );
}

#[test]
fn test_report_for_empty_result() {
    assert_eq!(analyze("SELECT 1").to_string(), "Parsing Result ::\n");
}
