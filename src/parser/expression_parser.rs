//! Scalar expression grammar, parsed by precedence climbing.
//!
//! ```sql
//! a OR b AND NOT c = d + e * -f
//! x [NOT] IN (SELECT ...) | x [NOT] IN (1, 2) | x [NOT] BETWEEN a AND b
//! CASE WHEN ... THEN ... ELSE ... END
//! CAST(x AS INT), CONVERT(INT, x), COUNT(DISTINCT x) OVER (PARTITION BY y)
//! (SELECT MAX(id) FROM t), EXISTS (SELECT 1 FROM t)
//! ```

use sqlparser::tokenizer::Token;

use super::identifier_utils::{is_identifier_token, is_word_ci, unquoted_word};
use super::tsql_parser::TsqlParser;
use crate::ast::{BinaryOperator, Expression, UnaryOperator, WhenClause};
use crate::error::ParseError;

const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_NOT: u8 = 3;
const PREC_COMPARISON: u8 = 4;
const PREC_ADDITIVE: u8 = 5;
const PREC_MULTIPLICATIVE: u8 = 6;
const PREC_UNARY: u8 = 7;

/// Reserved words that are still called like functions, e.g. `CONVERT(INT, @x)`.
const RESERVED_FUNCTIONS: &[&str] = &[
    "COALESCE",
    "CONTAINS",
    "CONVERT",
    "FREETEXT",
    "IDENTITY",
    "LEFT",
    "NULLIF",
    "RIGHT",
    "TRY_CONVERT",
    "UPDATE",
];

/// Keywords that stand alone as a value.
const KEYWORD_VALUES: &[&str] = &[
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "DEFAULT",
    "SESSION_USER",
    "SYSTEM_USER",
    "USER",
];

impl TsqlParser {
    pub(super) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_subexpression(0)
    }

    /// Comma-separated expressions (at least one).
    pub(super) fn parse_expression_list(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut list = vec![self.parse_expression()?];
        while self.base.consume_token(&Token::Comma) {
            list.push(self.parse_expression()?);
        }
        Ok(list)
    }

    /// Parse operators binding tighter than `min_precedence`.
    fn parse_subexpression(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        let mut expr = self.parse_prefix()?;
        while let Some(precedence) = self.infix_precedence() {
            if precedence <= min_precedence {
                break;
            }
            expr = self.parse_infix(expr, precedence)?;
        }
        Ok(expr)
    }

    fn infix_precedence(&self) -> Option<u8> {
        let precedence = match self.base.current()? {
            Token::Eq | Token::Neq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => {
                PREC_COMPARISON
            }
            Token::Plus | Token::Minus | Token::Ampersand | Token::Pipe | Token::Caret => {
                PREC_ADDITIVE
            }
            Token::Mul | Token::Div | Token::Mod => PREC_MULTIPLICATIVE,
            token => match unquoted_word(token)?.to_ascii_uppercase().as_str() {
                "OR" => PREC_OR,
                "AND" => PREC_AND,
                "IS" | "IN" | "LIKE" | "BETWEEN" => PREC_COMPARISON,
                "NOT" if self.negatable_operator_follows() => PREC_COMPARISON,
                "COLLATE" => PREC_UNARY,
                _ => return None,
            },
        };
        Some(precedence)
    }

    fn negatable_operator_follows(&self) -> bool {
        ["IN", "LIKE", "BETWEEN"]
            .iter()
            .any(|w| self.base.peek_word_ci(1, w))
    }

    fn parse_infix(&mut self, left: Expression, precedence: u8) -> Result<Expression, ParseError> {
        let Some(token) = self.base.next_token() else {
            return Err(self.base.error_unexpected());
        };

        let operator = match &token {
            Token::Eq => BinaryOperator::Eq,
            Token::Neq => BinaryOperator::NotEq,
            Token::Lt => BinaryOperator::Lt,
            Token::Gt => BinaryOperator::Gt,
            Token::LtEq => BinaryOperator::LtEq,
            Token::GtEq => BinaryOperator::GtEq,
            Token::Plus => BinaryOperator::Plus,
            Token::Minus => BinaryOperator::Minus,
            Token::Ampersand => BinaryOperator::BitwiseAnd,
            Token::Pipe => BinaryOperator::BitwiseOr,
            Token::Caret => BinaryOperator::BitwiseXor,
            Token::Mul => BinaryOperator::Multiply,
            Token::Div => BinaryOperator::Divide,
            Token::Mod => BinaryOperator::Modulo,
            t if is_word_ci(t, "OR") => BinaryOperator::Or,
            t if is_word_ci(t, "AND") => BinaryOperator::And,
            t if is_word_ci(t, "LIKE") => BinaryOperator::Like,
            t if is_word_ci(t, "IS") => return self.parse_is_null(left),
            t if is_word_ci(t, "COLLATE") => {
                self.parse_identifier()?;
                return Ok(left);
            }
            t if is_word_ci(t, "IN") => return self.parse_in(left, false),
            t if is_word_ci(t, "BETWEEN") => return self.parse_between(left, false),
            t if is_word_ci(t, "NOT") => {
                if self.base.consume_word_ci("LIKE") {
                    BinaryOperator::NotLike
                } else if self.base.consume_word_ci("IN") {
                    return self.parse_in(left, true);
                } else {
                    self.base.expect_word_ci("BETWEEN")?;
                    return self.parse_between(left, true);
                }
            }
            _ => return Err(self.base.error_unexpected()),
        };

        let right = self.parse_subexpression(precedence)?;
        if matches!(operator, BinaryOperator::Like | BinaryOperator::NotLike)
            && self.base.consume_word_ci("ESCAPE")
        {
            self.parse_subexpression(PREC_COMPARISON)?;
        }
        Ok(Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    /// `IS [NOT] NULL`, with `IS` already consumed.
    fn parse_is_null(&mut self, left: Expression) -> Result<Expression, ParseError> {
        let negated = self.base.consume_word_ci("NOT");
        self.base.expect_word_ci("NULL")?;
        Ok(Expression::IsNull {
            expression: Box::new(left),
            negated,
        })
    }

    /// `BETWEEN low AND high`, with `BETWEEN` already consumed.
    fn parse_between(&mut self, left: Expression, negated: bool) -> Result<Expression, ParseError> {
        let low = self.parse_subexpression(PREC_COMPARISON)?;
        self.base.expect_word_ci("AND")?;
        let high = self.parse_subexpression(PREC_COMPARISON)?;
        Ok(Expression::Between {
            expression: Box::new(left),
            low: Box::new(low),
            high: Box::new(high),
            negated,
        })
    }

    /// `IN (subquery)` or `IN (list)`, with `IN` already consumed.
    fn parse_in(&mut self, left: Expression, negated: bool) -> Result<Expression, ParseError> {
        self.base.expect_token(&Token::LParen)?;
        let result = if self.at_query_start() {
            Expression::InSubquery {
                expression: Box::new(left),
                subquery: Box::new(self.parse_query_expression()?),
                negated,
            }
        } else {
            Expression::InList {
                expression: Box::new(left),
                list: self.parse_expression_list()?,
                negated,
            }
        };
        self.base.expect_token(&Token::RParen)?;
        Ok(result)
    }

    fn parse_prefix(&mut self) -> Result<Expression, ParseError> {
        let Some(token) = self.base.current().cloned() else {
            return Err(self.base.error_expected("expression"));
        };

        match token {
            Token::Number(n, _) => {
                self.base.advance();
                Ok(Expression::NumberLiteral(n))
            }
            Token::HexStringLiteral(h) => {
                self.base.advance();
                Ok(Expression::NumberLiteral(format!("0x{h}")))
            }
            Token::SingleQuotedString(s) | Token::NationalStringLiteral(s) => {
                self.base.advance();
                Ok(Expression::StringLiteral(s))
            }
            Token::Placeholder(p) => {
                // `$action` in MERGE ... OUTPUT
                self.base.advance();
                Ok(Expression::Other(p))
            }
            Token::Mul => {
                self.base.advance();
                Ok(Expression::Star)
            }
            Token::Minus | Token::Plus | Token::Tilde => {
                self.base.advance();
                let operator = match token {
                    Token::Minus => UnaryOperator::Minus,
                    Token::Plus => UnaryOperator::Plus,
                    _ => UnaryOperator::BitwiseNot,
                };
                let operand = self.parse_subexpression(PREC_MULTIPLICATIVE)?;
                Ok(Expression::Unary {
                    operator,
                    expression: Box::new(operand),
                })
            }
            Token::LParen => self.parse_parenthesized_expression(),
            Token::Word(w) if w.quote_style.is_none() && w.value.starts_with('@') => {
                self.base.advance();
                self.parse_member_calls(Expression::Variable(w.value))
            }
            Token::Word(w) if w.quote_style.is_some() => self.parse_name_expression(),
            Token::Word(w) => self.parse_keyword_expression(&w.value),
            _ => Err(self.base.error_unexpected()),
        }
    }

    /// Expressions introduced by an unquoted word: keywords first, then names.
    fn parse_keyword_expression(&mut self, word: &str) -> Result<Expression, ParseError> {
        match word.to_ascii_uppercase().as_str() {
            "NULL" => {
                self.base.advance();
                Ok(Expression::Null)
            }
            "NOT" => {
                self.base.advance();
                let operand = self.parse_subexpression(PREC_NOT)?;
                Ok(Expression::Unary {
                    operator: UnaryOperator::Not,
                    expression: Box::new(operand),
                })
            }
            "EXISTS" => {
                self.base.advance();
                self.base.expect_token(&Token::LParen)?;
                let query = self.parse_query_expression()?;
                self.base.expect_token(&Token::RParen)?;
                Ok(Expression::Exists(Box::new(query)))
            }
            "CASE" => self.parse_case_expression(),
            "CAST" | "TRY_CAST" | "PARSE" | "TRY_PARSE"
                if self.base.peek_token(1, &Token::LParen) =>
            {
                self.parse_cast_expression()
            }
            "NEXT" if self.base.peek_word_ci(1, "VALUE") => {
                // NEXT VALUE FOR dbo.Sequence
                self.base.advance();
                self.base.advance();
                self.base.expect_word_ci("FOR")?;
                let name = self.parse_multipart_identifier()?;
                Ok(Expression::Other(format!("NEXT VALUE FOR {}", name.join("."))))
            }
            upper if RESERVED_FUNCTIONS.contains(&upper) && self.base.peek_token(1, &Token::LParen) => {
                self.base.advance();
                self.parse_function_call(vec![word.to_string()])
            }
            upper if KEYWORD_VALUES.contains(&upper) => {
                self.base.advance();
                Ok(Expression::Other(upper.to_string()))
            }
            _ if self.base.current().is_some_and(is_identifier_token) => {
                self.parse_name_expression()
            }
            _ => Err(self.base.error_unexpected()),
        }
    }

    /// Column reference, function call or static method call.
    fn parse_name_expression(&mut self) -> Result<Expression, ParseError> {
        let name = self.parse_multipart_identifier()?;
        if self.base.check_token(&Token::LParen) {
            return self.parse_function_call(name);
        }
        if self.base.check_token(&Token::DoubleColon) {
            // geography::Point(...)
            self.base.advance();
            let mut qualified = name;
            qualified.extend(self.parse_multipart_identifier()?);
            if self.base.check_token(&Token::LParen) {
                return self.parse_function_call(qualified);
            }
            return Ok(Expression::Column(qualified));
        }
        Ok(Expression::Column(name))
    }

    /// Argument list and trailing window clause, with the name already consumed.
    fn parse_function_call(&mut self, name: Vec<String>) -> Result<Expression, ParseError> {
        self.base.expect_token(&Token::LParen)?;
        let mut arguments = Vec::new();
        if !self.base.check_token(&Token::RParen) {
            // COUNT(DISTINCT x), COUNT(ALL x)
            if self.check_any_word_ci(&["DISTINCT", "ALL"]) {
                self.base.advance();
            }
            arguments = self.parse_expression_list()?;
        }
        self.base.expect_token(&Token::RParen)?;

        if self.base.check_word_ci("WITHIN") && self.base.peek_word_ci(1, "GROUP") {
            self.base.advance();
            self.base.advance();
            self.base.skip_parenthesized()?;
        }
        if self.base.check_word_ci("OVER") && self.base.peek_token(1, &Token::LParen) {
            self.base.advance();
            self.base.skip_parenthesized()?;
        }

        self.parse_member_calls(Expression::Function { name, arguments })
    }

    /// XML and CLR methods applied to a value: `@doc.value('(/a)[1]', 'INT')`.
    fn parse_member_calls(&mut self, mut expr: Expression) -> Result<Expression, ParseError> {
        while self.base.check_token(&Token::Period)
            && matches!(self.base.peek(1), Some(Token::Word(_)))
            && self.base.peek_token(2, &Token::LParen)
        {
            self.base.advance();
            let method = match self.base.next_token() {
                Some(Token::Word(w)) => w.value,
                _ => return Err(self.base.error_unexpected()),
            };
            self.base.expect_token(&Token::LParen)?;
            let mut arguments = vec![expr];
            if !self.base.check_token(&Token::RParen) {
                arguments.extend(self.parse_expression_list()?);
            }
            self.base.expect_token(&Token::RParen)?;
            expr = Expression::Function {
                name: vec![method],
                arguments,
            };
        }
        Ok(expr)
    }

    /// `(expr)` or a scalar subquery `(SELECT ...)`.
    fn parse_parenthesized_expression(&mut self) -> Result<Expression, ParseError> {
        self.base.expect_token(&Token::LParen)?;
        let expr = if self.at_query_start() {
            Expression::ScalarSubquery(Box::new(self.parse_query_expression()?))
        } else {
            Expression::Parenthesized(Box::new(self.parse_expression()?))
        };
        self.base.expect_token(&Token::RParen)?;
        Ok(expr)
    }

    fn parse_case_expression(&mut self) -> Result<Expression, ParseError> {
        self.base.expect_word_ci("CASE")?;
        let operand = if self.base.check_word_ci("WHEN") {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let mut when_clauses = Vec::new();
        while self.base.consume_word_ci("WHEN") {
            let condition = self.parse_expression()?;
            self.base.expect_word_ci("THEN")?;
            let result = self.parse_expression()?;
            when_clauses.push(WhenClause { condition, result });
        }
        if when_clauses.is_empty() {
            return Err(self.base.error_expected("WHEN"));
        }

        let else_result = if self.base.consume_word_ci("ELSE") {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.base.expect_word_ci("END")?;

        Ok(Expression::Case {
            operand,
            when_clauses,
            else_result,
        })
    }

    /// `CAST(x AS type)`, `TRY_CAST`, and `PARSE(x AS type USING culture)`.
    fn parse_cast_expression(&mut self) -> Result<Expression, ParseError> {
        self.base.advance();
        self.base.expect_token(&Token::LParen)?;
        let expression = self.parse_expression()?;
        self.base.expect_word_ci("AS")?;
        let data_type = self.parse_data_type()?;
        if self.base.consume_word_ci("USING") {
            self.parse_expression()?;
        }
        self.base.expect_token(&Token::RParen)?;
        Ok(Expression::Cast {
            expression: Box::new(expression),
            data_type,
        })
    }
}
