//! Base token parser providing common navigation helpers for T-SQL parsing.
//!
//! `TokenParser` owns the token stream of one batch with whitespace and comments
//! removed, and a cursor into it. The grammar in `tsql_parser` and its sibling
//! modules is written entirely in terms of these helpers.

use sqlparser::dialect::MsSqlDialect;
use sqlparser::tokenizer::{Token, TokenWithSpan, Tokenizer};

use super::identifier_utils::{format_token, is_word_ci};
use crate::error::ParseError;

/// Base token parser with common helper methods for T-SQL parsing.
pub struct TokenParser {
    tokens: Vec<TokenWithSpan>,
    pos: usize,
    /// Added to token line numbers so errors are absolute within the script
    line_offset: u64,
}

impl TokenParser {
    /// Tokenize `sql` with MsSqlDialect, dropping whitespace and comments.
    ///
    /// `start_line` is the 1-based script line the text starts on.
    pub fn new(sql: &str, start_line: usize) -> Result<Self, ParseError> {
        let dialect = MsSqlDialect {};
        let line_offset = start_line.saturating_sub(1) as u64;
        let tokens = Tokenizer::new(&dialect, sql)
            .tokenize_with_location()
            .map_err(|e| {
                ParseError::new(
                    e.message,
                    e.location.line + line_offset,
                    e.location.column,
                )
            })?;

        let tokens = tokens
            .into_iter()
            .filter(|t| !matches!(t.token, Token::Whitespace(_) | Token::EOF))
            .collect();

        Ok(Self {
            tokens,
            pos: 0,
            line_offset,
        })
    }

    // ========================================================================
    // Position and state
    // ========================================================================

    /// Check if at end of tokens.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Get current position in token stream.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Set current position in token stream (used to backtrack).
    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    // ========================================================================
    // Token access
    // ========================================================================

    /// Get current token without consuming.
    #[inline]
    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Peek at a token at an offset from current position.
    #[inline]
    pub fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    /// Advance to next token.
    #[inline]
    pub fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    /// Consume and return the current token.
    pub fn next_token(&mut self) -> Option<Token> {
        let token = self.current().cloned();
        self.advance();
        token
    }

    // ========================================================================
    // Token type checks
    // ========================================================================

    /// Check if current token is an unquoted word matching (case-insensitive).
    #[inline]
    pub fn check_word_ci(&self, word: &str) -> bool {
        self.current().is_some_and(|t| is_word_ci(t, word))
    }

    /// Check if the token at `offset` is an unquoted word matching (case-insensitive).
    #[inline]
    pub fn peek_word_ci(&self, offset: usize, word: &str) -> bool {
        self.peek(offset).is_some_and(|t| is_word_ci(t, word))
    }

    /// Check if current token matches a specific token type (by discriminant).
    #[inline]
    pub fn check_token(&self, expected: &Token) -> bool {
        self.current()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    /// Check the token at `offset` by discriminant.
    #[inline]
    pub fn peek_token(&self, offset: usize, expected: &Token) -> bool {
        self.peek(offset)
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    // ========================================================================
    // Consume helpers
    // ========================================================================

    /// Consume the word if present. Returns whether it was consumed.
    pub fn consume_word_ci(&mut self, word: &str) -> bool {
        if self.check_word_ci(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the token type if present. Returns whether it was consumed.
    pub fn consume_token(&mut self, expected: &Token) -> bool {
        if self.check_token(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific word (case-insensitive), advancing if found.
    pub fn expect_word_ci(&mut self, word: &str) -> Result<(), ParseError> {
        if self.consume_word_ci(word) {
            Ok(())
        } else {
            Err(self.error_expected(word))
        }
    }

    /// Expect a specific token type, advancing if found.
    pub fn expect_token(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.consume_token(expected) {
            Ok(())
        } else {
            Err(self.error_expected(&format_token(expected)))
        }
    }

    // ========================================================================
    // Skipping
    // ========================================================================

    /// Skip a parenthesized group, handling nested parentheses.
    ///
    /// Position should be at the opening parenthesis; afterwards it is just past
    /// the matching closing one.
    pub fn skip_parenthesized(&mut self) -> Result<(), ParseError> {
        self.expect_token(&Token::LParen)?;
        let mut depth = 1;
        while let Some(token) = self.next_token() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.error_expected(")"))
    }

    /// Skip to the end of the token stream.
    pub fn skip_to_end(&mut self) {
        self.pos = self.tokens.len();
    }

    /// Concatenate tokens from `start_pos` to the current position as SQL text.
    pub fn text_since(&self, start_pos: usize) -> String {
        let mut text = String::new();
        for (i, t) in self.tokens[start_pos..self.pos].iter().enumerate() {
            let piece = format_token(&t.token);
            let glued = matches!(t.token, Token::LParen | Token::RParen | Token::Comma)
                || (i > 0
                    && matches!(self.tokens[start_pos + i - 1].token, Token::LParen | Token::Period))
                || matches!(t.token, Token::Period);
            if i > 0 && !glued {
                text.push(' ');
            }
            text.push_str(&piece);
        }
        text
    }

    // ========================================================================
    // Errors
    // ========================================================================

    /// Error positioned at the current token (or the last token at end of input).
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        let span = self
            .tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span);
        match span {
            Some(span) => ParseError::new(
                message,
                span.start.line + self.line_offset,
                span.start.column,
            ),
            None => ParseError::new(message, self.line_offset + 1, 1),
        }
    }

    /// `Incorrect syntax near '<token>'.` with an expectation hint.
    pub fn error_expected(&self, expected: &str) -> ParseError {
        self.error(format!(
            "Incorrect syntax near {}: expected {}",
            self.describe_current(),
            expected
        ))
    }

    /// `Incorrect syntax near '<token>'.`
    pub fn error_unexpected(&self) -> ParseError {
        self.error(format!("Incorrect syntax near {}", self.describe_current()))
    }

    fn describe_current(&self) -> String {
        match self.current() {
            Some(token) => format!("'{}'", format_token(token)),
            None => "end of batch".to_string(),
        }
    }
}
