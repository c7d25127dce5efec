//! Reading scripts from disk: encodings and I/O failures

use pretty_assertions::assert_eq;
use tsql_lineage::OperationType::Read;
use tsql_lineage::{analyze_file, LineageError, SqlVersion};

use crate::common::{assert_parsed, entries, entry, TestContext};

fn utf16le_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

#[test]
fn test_utf8_script() {
    let ctx = TestContext::empty();
    ctx.write_script("plain.sql", b"SELECT * FROM dbo.Orders o");
    let result = ctx.analyze("plain.sql");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.orders", Read, Some("o"))]);
}

#[test]
fn test_utf8_bom_script() {
    let ctx = TestContext::empty();
    ctx.write_script("bom.sql", b"\xEF\xBB\xBFSELECT * FROM dbo.Orders");
    let result = ctx.analyze("bom.sql");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.orders", Read, None)]);
}

#[test]
fn test_utf16_script() {
    let ctx = TestContext::empty();
    ctx.write_script(
        "unicode.sql",
        &utf16le_with_bom("SELECT * FROM dbo.Kunden WHERE name = N'Müller'\r\nGO\r\n"),
    );
    let result = ctx.analyze("unicode.sql");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.kunden", Read, None)]);
}

#[test]
fn test_windows_1252_script() {
    let ctx = TestContext::empty();
    ctx.write_script("legacy.sql", b"SELECT * FROM dbo.Caf\xE9");
    let result = ctx.analyze("legacy.sql");
    assert_parsed(&result);
    assert_eq!(entries(&result), vec![entry("dbo.café", Read, None)]);
}

#[test]
fn test_missing_script_is_a_read_error() {
    let ctx = TestContext::empty();
    let path = ctx.script_path("missing.sql");
    let err = analyze_file(&path, SqlVersion::default()).unwrap_err();
    assert!(
        matches!(&err, LineageError::ScriptReadError { path: p, .. } if p == &path),
        "{:?}",
        err
    );
}

#[test]
fn test_malformed_utf16_is_a_decode_error() {
    let ctx = TestContext::empty();
    // Lone high surrogate
    let path = ctx.write_script("broken.sql", &[0xFF, 0xFE, 0x00, 0xD8, 0x41, 0x00]);
    let err = analyze_file(&path, SqlVersion::default()).unwrap_err();
    assert!(matches!(err, LineageError::ScriptDecodeError { .. }), "{:?}", err);
}

#[test]
fn test_syntax_errors_are_results_not_errors() {
    let ctx = TestContext::with_fixture("broken");
    let result = ctx.analyze("second_batch.sql");
    assert_eq!(result.parsing_error(), Some("Incorrect syntax near 'END'"));
    assert_eq!(
        result.parse_errors()[0].to_string(),
        "Incorrect syntax near 'END' (line 4, column 1)"
    );
    assert!(result.table_references().is_empty());
}
