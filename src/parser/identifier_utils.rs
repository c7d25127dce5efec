//! Identifier and keyword classification for T-SQL tokens.
//!
//! sqlparser's keyword table is shared by every dialect, so T-SQL reserved words are
//! classified here by value. Quoted identifiers (`[Select]`, `"From"`) are never keywords.

use sqlparser::tokenizer::{Token, Word};

/// SQL Server reserved keywords. An unquoted reserved keyword can never be an identifier,
/// which is what lets the parser tell an implicit alias from the next clause or statement.
const RESERVED_KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "AUTHORIZATION", "BACKUP", "BEGIN",
    "BETWEEN", "BREAK", "BROWSE", "BULK", "BY", "CASCADE", "CASE", "CHECK", "CHECKPOINT",
    "CLOSE", "CLUSTERED", "COALESCE", "COLLATE", "COLUMN", "COMMIT", "COMPUTE", "CONSTRAINT",
    "CONTAINS", "CONTAINSTABLE", "CONTINUE", "CONVERT", "CREATE", "CROSS", "CURRENT",
    "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR", "DATABASE",
    "DBCC", "DEALLOCATE", "DECLARE", "DEFAULT", "DELETE", "DENY", "DESC", "DISK", "DISTINCT",
    "DISTRIBUTED", "DOUBLE", "DROP", "DUMP", "ELSE", "END", "ERRLVL", "ESCAPE", "EXCEPT", "EXEC",
    "EXECUTE", "EXISTS", "EXIT", "EXTERNAL", "FETCH", "FILE", "FILLFACTOR", "FOR", "FOREIGN",
    "FREETEXT", "FREETEXTTABLE", "FROM", "FULL", "FUNCTION", "GOTO", "GRANT", "GROUP", "HAVING",
    "HOLDLOCK", "IDENTITY", "IDENTITY_INSERT", "IDENTITYCOL", "IF", "IN", "INDEX", "INNER",
    "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "KILL", "LEFT", "LIKE", "LINENO", "LOAD",
    "MERGE", "NATIONAL", "NOCHECK", "NONCLUSTERED", "NOT", "NULL", "NULLIF", "OF", "OFF",
    "OFFSETS", "ON", "OPEN", "OPENDATASOURCE", "OPENQUERY", "OPENROWSET", "OPENXML", "OPTION",
    "OR", "ORDER", "OUTER", "OVER", "PERCENT", "PIVOT", "PLAN", "PRECISION", "PRIMARY", "PRINT",
    "PROC", "PROCEDURE", "PUBLIC", "RAISERROR", "READ", "READTEXT", "RECONFIGURE", "REFERENCES",
    "REPLICATION", "RESTORE", "RESTRICT", "RETURN", "REVERT", "REVOKE", "RIGHT", "ROLLBACK",
    "ROWCOUNT", "ROWGUIDCOL", "RULE", "SAVE", "SCHEMA", "SECURITYAUDIT", "SELECT",
    "SEMANTICKEYPHRASETABLE", "SEMANTICSIMILARITYDETAILSTABLE", "SEMANTICSIMILARITYTABLE",
    "SESSION_USER", "SET", "SETUSER", "SHUTDOWN", "SOME", "STATISTICS", "SYSTEM_USER", "TABLE",
    "TABLESAMPLE", "TEXTSIZE", "THEN", "TO", "TOP", "TRAN", "TRANSACTION", "TRIGGER", "TRUNCATE",
    "TRY_CONVERT", "TSEQUAL", "UNION", "UNIQUE", "UNPIVOT", "UPDATE", "UPDATETEXT", "USE", "USER",
    "VALUES", "VARYING", "VIEW", "WAITFOR", "WHEN", "WHERE", "WHILE", "WITH", "WRITETEXT",
];

/// Unreserved words that still end a table or column reference in the positions
/// where an implicit alias could otherwise be read.
const NON_ALIAS_WORDS: &[&str] = &["OUTPUT", "USING", "THROW", "WINDOW", "OFFSET", "GO"];

/// Words that begin a statement. Unmodeled statements are consumed up to the next one.
const STATEMENT_START_WORDS: &[&str] = &[
    "ALTER", "BACKUP", "BEGIN", "BREAK", "BULK", "CHECKPOINT", "CLOSE", "COMMIT", "CONTINUE",
    "CREATE", "DBCC", "DEALLOCATE", "DECLARE", "DELETE", "DENY", "DROP", "EXEC", "EXECUTE",
    "FETCH", "GOTO", "GRANT", "IF", "INSERT", "KILL", "MERGE", "OPEN", "PRINT", "RAISERROR",
    "RECONFIGURE", "RESTORE", "RETURN", "REVERT", "REVOKE", "ROLLBACK", "SAVE", "SELECT", "SET",
    "SETUSER", "SHUTDOWN", "THROW", "TRUNCATE", "UPDATE", "USE", "WAITFOR", "WHILE",
];

/// Unquoted word text of a token, if the token is an unquoted word.
#[inline]
pub fn unquoted_word(token: &Token) -> Option<&str> {
    match token {
        Token::Word(w) if w.quote_style.is_none() => Some(w.value.as_str()),
        _ => None,
    }
}

/// Whether a token is the given unquoted word, compared case-insensitively.
#[inline]
pub fn is_word_ci(token: &Token, word: &str) -> bool {
    unquoted_word(token).is_some_and(|w| w.eq_ignore_ascii_case(word))
}

pub fn is_reserved_keyword(word: &str) -> bool {
    RESERVED_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(word))
}

/// Whether the word starts a statement (`WITH` is handled separately by the caller,
/// since it also introduces table hints and clause options).
pub fn is_statement_start(word: &str) -> bool {
    STATEMENT_START_WORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(word))
}

/// Whether a token can be read as an alias or an identifier.
///
/// Quoted identifiers always qualify; unquoted words qualify unless reserved.
/// Variables (`@x`) never do.
pub fn is_identifier_token(token: &Token) -> bool {
    match token {
        Token::Word(w) if w.quote_style.is_some() => true,
        Token::Word(w) => !w.value.starts_with('@') && !is_reserved_keyword(&w.value),
        _ => false,
    }
}

/// Whether a token can be an implicit alias (one written without `AS`).
pub fn is_implicit_alias_token(token: &Token) -> bool {
    if !is_identifier_token(token) {
        return false;
    }
    match unquoted_word(token) {
        Some(w) => !NON_ALIAS_WORDS.iter().any(|k| k.eq_ignore_ascii_case(w)),
        None => true,
    }
}

/// Whether a token is a variable reference such as `@id` or `@@ROWCOUNT`.
#[inline]
pub fn is_variable_token(token: &Token) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.value.starts_with('@'))
}

/// Converts a sqlparser-rs Word token to a properly quoted string.
///
/// - `Some('[')` -> `[identifier]`
/// - `Some('"')` -> `"identifier"`
/// - `None` -> `identifier` (unquoted)
pub fn format_word(word: &Word) -> String {
    match word.quote_style {
        Some('[') => format!("[{}]", word.value),
        Some('"') => format!("\"{}\"", word.value),
        _ => word.value.clone(),
    }
}

/// Converts a sqlparser-rs Token back to SQL text.
///
/// Used for data type text and for the token named in syntax error messages.
pub fn format_token(token: &Token) -> String {
    match token {
        Token::Word(w) => format_word(w),
        Token::Number(n, _) => n.clone(),
        Token::SingleQuotedString(s) => format!("'{}'", s.replace('\'', "''")),
        Token::NationalStringLiteral(s) => format!("N'{}'", s.replace('\'', "''")),
        Token::HexStringLiteral(s) => format!("0x{}", s),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::Comma => ",".to_string(),
        Token::Period => ".".to_string(),
        Token::SemiColon => ";".to_string(),
        Token::Colon => ":".to_string(),
        Token::Plus => "+".to_string(),
        Token::Minus => "-".to_string(),
        Token::Mul => "*".to_string(),
        Token::Div => "/".to_string(),
        Token::Mod => "%".to_string(),
        Token::Eq => "=".to_string(),
        Token::Neq => "<>".to_string(),
        Token::Lt => "<".to_string(),
        Token::Gt => ">".to_string(),
        Token::LtEq => "<=".to_string(),
        Token::GtEq => ">=".to_string(),
        Token::EOF => "end of script".to_string(),
        _ => format!("{}", token),
    }
}
