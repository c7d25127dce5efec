//! Grammar gates by SQL Server version

use tsql_lineage::{analyze, SqlVersion};

#[test]
fn test_default_version_is_sql_server_2014() {
    assert_eq!(SqlVersion::default(), SqlVersion::Sql120);
}

#[test]
fn test_version_parses_from_number_and_name() {
    assert_eq!("100".parse::<SqlVersion>().unwrap(), SqlVersion::Sql100);
    assert_eq!("Sql130".parse::<SqlVersion>().unwrap(), SqlVersion::Sql130);
    assert!("150".parse::<SqlVersion>().is_err());
}

#[test]
fn test_merge_needs_sql_server_2008() {
    let sql = "MERGE t USING s ON t.id = s.id WHEN MATCHED THEN DELETE;";
    assert!(analyze(sql, SqlVersion::Sql90).has_parsing_error());
    assert!(!analyze(sql, SqlVersion::Sql100).has_parsing_error());
}

#[test]
fn test_cte_needs_sql_server_2005() {
    let sql = "WITH a AS (SELECT id FROM t) SELECT * FROM a";
    assert!(analyze(sql, SqlVersion::Sql80).has_parsing_error());
    assert!(!analyze(sql, SqlVersion::Sql90).has_parsing_error());
}

#[test]
fn test_try_catch_needs_sql_server_2005() {
    let sql = "BEGIN TRY SELECT 1 END TRY BEGIN CATCH SELECT 2 END CATCH";
    assert!(analyze(sql, SqlVersion::Sql80).has_parsing_error());
    assert!(!analyze(sql, SqlVersion::Sql90).has_parsing_error());
}

#[test]
fn test_create_or_alter_needs_sql_server_2016() {
    let sql = "CREATE OR ALTER PROCEDURE dbo.p AS SELECT 1";
    let old = analyze(sql, SqlVersion::Sql120);
    assert!(old.has_parsing_error());
    assert!(old.procedure_name().is_none());

    let new = analyze(sql, SqlVersion::Sql130);
    assert_eq!(new.procedure_name(), Some("dbo.p"));
}

#[test]
fn test_every_version_accepts_basic_statements() {
    let sql = "SELECT a.id FROM dbo.A a JOIN dbo.B b ON b.id = a.id; UPDATE dbo.A SET v = 1; EXEC dbo.p";
    for version in SqlVersion::ALL {
        let result = analyze(sql, version);
        assert!(!result.has_parsing_error(), "{}: {:?}", version, result.parsing_error());
        assert_eq!(result.table_references().len(), 3, "{}", version);
    }
}
