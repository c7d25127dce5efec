//! T-SQL script parser: batches in, syntax tree out.
//!
//! The grammar is split across modules that each add an `impl TsqlParser` block:
//! `statement_parser` (statements and control flow), `query_parser` (queries and
//! table sources) and `expression_parser` (scalar expressions).

use sqlparser::tokenizer::Token;

use super::batch::split_batches;
use super::identifier_utils::{
    is_identifier_token, is_implicit_alias_token, is_statement_start, is_variable_token, is_word_ci,
    unquoted_word,
};
use super::token_parser_base::TokenParser;
use super::version::SqlVersion;
use crate::ast::{self, SchemaObjectName, Script, Statement};
use crate::error::ParseError;

/// Parse a whole script into a syntax tree.
///
/// Each `GO` batch is parsed independently. A syntax error ends parsing of its own
/// batch only, so every batch's first error is reported, in script order.
pub fn parse_script(text: &str, version: SqlVersion) -> Result<Script, Vec<ParseError>> {
    let mut script = Script::default();
    let mut errors = Vec::new();

    for batch in split_batches(text) {
        if batch.content.trim().is_empty() {
            continue;
        }
        let parsed = TsqlParser::new(batch.content, batch.start_line, version)
            .and_then(|mut parser| parser.parse_batch());
        match parsed {
            Ok(parsed) => script.batches.push(parsed),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(script)
    } else {
        Err(errors)
    }
}

/// Recursive-descent parser over the tokens of one batch.
pub struct TsqlParser {
    pub(super) base: TokenParser,
    pub(super) version: SqlVersion,
}

impl TsqlParser {
    pub fn new(sql: &str, start_line: usize, version: SqlVersion) -> Result<Self, ParseError> {
        Ok(Self {
            base: TokenParser::new(sql, start_line)?,
            version,
        })
    }

    /// Parse every statement of the batch.
    pub fn parse_batch(&mut self) -> Result<ast::Batch, ParseError> {
        let statements = self.parse_statement_list(|p| p.base.is_at_end())?;
        Ok(ast::Batch { statements })
    }

    /// Parse statements until `stop` returns true or the batch ends.
    ///
    /// Semicolons between statements are consumed.
    pub(super) fn parse_statement_list(
        &mut self,
        stop: impl Fn(&Self) -> bool,
    ) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            while self.base.consume_token(&Token::SemiColon) {}
            if self.base.is_at_end() || stop(self) {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// Fail with `Incorrect syntax near ...` unless `supported`.
    pub(super) fn require(&self, supported: bool) -> Result<(), ParseError> {
        if supported {
            Ok(())
        } else {
            Err(self.base.error_unexpected())
        }
    }

    /// Whether the current token is an unquoted word from `words`.
    pub(super) fn check_any_word_ci(&self, words: &[&str]) -> bool {
        self.base
            .current()
            .and_then(unquoted_word)
            .is_some_and(|w| words.iter().any(|k| k.eq_ignore_ascii_case(w)))
    }

    /// Whether the current token is a variable such as `@id`.
    pub(super) fn check_variable(&self) -> bool {
        self.base.current().is_some_and(is_variable_token)
    }

    /// Width in tokens of `=` or a compound assignment such as `+=` at `offset`.
    pub(super) fn assignment_operator_width(&self, offset: usize) -> Option<usize> {
        match self.base.peek(offset)? {
            Token::Eq => Some(1),
            Token::Plus
            | Token::Minus
            | Token::Mul
            | Token::Div
            | Token::Mod
            | Token::Ampersand
            | Token::Pipe
            | Token::Caret
                if self.base.peek_token(offset + 1, &Token::Eq) =>
            {
                Some(2)
            }
            _ => None,
        }
    }

    /// Consume a variable token and return its name (including `@`).
    pub(super) fn parse_variable(&mut self) -> Result<String, ParseError> {
        if self.check_variable() {
            if let Some(Token::Word(w)) = self.base.next_token() {
                return Ok(w.value);
            }
        }
        Err(self.base.error_expected("variable"))
    }

    /// Consume a single identifier (quoted, or unquoted and not reserved).
    pub(super) fn parse_identifier(&mut self) -> Result<String, ParseError> {
        if let Some(Token::Word(w)) = self.base.current().filter(|t| is_identifier_token(t)) {
            let value = w.value.clone();
            self.base.advance();
            return Ok(value);
        }
        Err(self.base.error_expected("identifier"))
    }

    /// Consume a dotted name such as `db.dbo.Orders` or `[dbo].[Orders]`.
    ///
    /// Parts after the first may be any word, including reserved keywords, and
    /// may be empty (`db..Orders`).
    pub(super) fn parse_multipart_identifier(&mut self) -> Result<Vec<String>, ParseError> {
        let mut parts = vec![self.parse_identifier()?];
        while self.base.check_token(&Token::Period) {
            self.base.advance();
            if self.base.check_token(&Token::Period) {
                parts.push(String::new());
                continue;
            }
            match self.base.current() {
                Some(Token::Word(w)) => {
                    parts.push(w.value.clone());
                    self.base.advance();
                }
                _ => return Err(self.base.error_expected("identifier")),
            }
        }
        Ok(parts)
    }

    pub(super) fn parse_schema_object_name(&mut self) -> Result<SchemaObjectName, ParseError> {
        Ok(SchemaObjectName::new(self.parse_multipart_identifier()?))
    }

    /// Parenthesized identifier list such as a column list `(a, b, [c])`.
    pub(super) fn parse_column_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.base.expect_token(&Token::LParen)?;
        let mut columns = Vec::new();
        loop {
            let mut parts = self.parse_multipart_identifier()?;
            columns.push(parts.pop().unwrap_or_default());
            if !self.base.consume_token(&Token::Comma) {
                break;
            }
        }
        self.base.expect_token(&Token::RParen)?;
        Ok(columns)
    }

    /// Data type text as written, e.g. `INT`, `DECIMAL(18, 2)`, `[dbo].[IdList]`.
    pub(super) fn parse_data_type(&mut self) -> Result<String, ParseError> {
        let start = self.base.pos();
        if !matches!(self.base.current(), Some(Token::Word(w)) if !w.value.starts_with('@')) {
            return Err(self.base.error_expected("data type"));
        }
        self.base.advance();
        while self.base.check_token(&Token::Period) {
            self.base.advance();
            if !matches!(self.base.current(), Some(Token::Word(_))) {
                return Err(self.base.error_expected("data type"));
            }
            self.base.advance();
        }
        // DOUBLE PRECISION, CHARACTER VARYING, NATIONAL CHARACTER ...
        while self.check_any_word_ci(&["PRECISION", "VARYING", "CHARACTER", "CHAR", "VARCHAR"]) {
            self.base.advance();
        }
        if self.base.check_token(&Token::LParen) {
            self.base.skip_parenthesized()?;
        }
        Ok(self.base.text_since(start))
    }

    /// `[AS] alias`, where an implicit alias must not be a clause keyword.
    pub(super) fn parse_optional_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.base.consume_word_ci("AS") {
            return match self.base.current() {
                Some(Token::SingleQuotedString(s)) => {
                    let alias = s.clone();
                    self.base.advance();
                    Ok(Some(alias))
                }
                _ => self.parse_identifier().map(Some),
            };
        }
        // `name:` is a label starting the next statement
        if self.base.peek_token(1, &Token::Colon) {
            return Ok(None);
        }
        if let Some(Token::Word(w)) = self.base.current().filter(|t| is_implicit_alias_token(t)) {
            let alias = w.value.clone();
            self.base.advance();
            return Ok(Some(alias));
        }
        Ok(None)
    }

    /// Whether the current token starts a new statement (or ends the enclosing block).
    pub(super) fn at_statement_boundary(&self) -> bool {
        let Some(token) = self.base.current() else {
            return true;
        };
        if matches!(token, Token::SemiColon) {
            return true;
        }
        // `label:`
        if is_identifier_token(token) && self.base.peek_token(1, &Token::Colon) {
            return true;
        }
        let Some(word) = unquoted_word(token) else {
            return false;
        };
        if word.eq_ignore_ascii_case("END") || word.eq_ignore_ascii_case("ELSE") {
            return true;
        }
        if word.eq_ignore_ascii_case("WITH") {
            return self.at_cte_start();
        }
        if word.eq_ignore_ascii_case("IF") {
            // `DROP TABLE IF EXISTS t` keeps going
            return !(self.base.peek_word_ci(1, "EXISTS")
                && !self.base.peek_token(2, &Token::LParen));
        }
        is_statement_start(word)
    }

    /// `WITH name AS (` or `WITH name (cols) AS (` introduces common table expressions.
    pub(super) fn at_cte_start(&self) -> bool {
        if !self.base.check_word_ci("WITH") {
            return false;
        }
        let named = self.base.peek(1).is_some_and(is_identifier_token);
        named && (self.base.peek_word_ci(2, "AS") || self.base.peek_token(2, &Token::LParen))
    }

    /// Consume the remaining tokens of an unmodeled statement.
    ///
    /// Stops at the next statement boundary outside parentheses and CASE
    /// expressions. Unbalanced closing parentheses are consumed rather than
    /// reported.
    pub(super) fn skip_statement_remainder(&mut self) {
        let mut paren_depth = 0usize;
        let mut case_depth = 0usize;
        let mut after_on = false;
        let mut seen_references = false;
        while let Some(token) = self.base.current() {
            // REFERENCES t (id) ON DELETE CASCADE, ON UPDATE NO ACTION
            let referential_action = seen_references
                && after_on
                && (is_word_ci(token, "DELETE") || is_word_ci(token, "UPDATE"));
            if paren_depth == 0
                && case_depth == 0
                && !referential_action
                && self.at_statement_boundary()
            {
                break;
            }
            after_on = is_word_ci(token, "ON");
            seen_references |= is_word_ci(token, "REFERENCES");
            match token {
                Token::LParen => paren_depth += 1,
                Token::RParen => paren_depth = paren_depth.saturating_sub(1),
                t if is_word_ci(t, "CASE") => case_depth += 1,
                t if is_word_ci(t, "END") => case_depth = case_depth.saturating_sub(1),
                _ => {}
            }
            self.base.advance();
        }
    }

    /// Skip `OPTION (...)` query hints at the end of a DML statement.
    pub(super) fn skip_query_options(&mut self) -> Result<(), ParseError> {
        if self.base.check_word_ci("OPTION") && self.base.peek_token(1, &Token::LParen) {
            self.base.advance();
            self.base.skip_parenthesized()?;
        }
        Ok(())
    }
}
