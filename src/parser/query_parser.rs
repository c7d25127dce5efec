//! Query grammar: WITH clauses, SELECT specifications, set operations and
//! FROM-clause table sources.
//!
//! ```sql
//! WITH cte (a, b) AS (SELECT ...)
//! SELECT [DISTINCT] [TOP (n)] a, t.*, @v = b INTO #t
//! FROM dbo.t1 AS a WITH (NOLOCK)
//!     INNER JOIN (SELECT ...) AS d ON ...
//!     CROSS APPLY dbo.fn(a.id) f
//! WHERE ... GROUP BY ... HAVING ...
//! UNION ALL SELECT ...
//! ORDER BY ... OFFSET 10 ROWS FETCH NEXT 10 ROWS ONLY
//! FOR XML PATH('')
//! ```

use sqlparser::tokenizer::Token;

use super::identifier_utils::is_identifier_token;
use super::tsql_parser::TsqlParser;
use crate::ast::{
    CommonTableExpression, Expression, JoinKind, JoinTableReference, QueryExpression,
    QuerySpecification, SchemaObjectName, SelectElement, SetOperator, TableFactor, WithClause,
};
use crate::error::ParseError;

/// Rowset functions that are reserved words: `OPENQUERY(server, '...')`.
const ROWSET_FUNCTIONS: &[&str] = &[
    "CONTAINSTABLE",
    "FREETEXTTABLE",
    "OPENDATASOURCE",
    "OPENQUERY",
    "OPENROWSET",
    "OPENXML",
];

/// Table hints accepted in the legacy form without `WITH`: `FROM t (NOLOCK)`.
const LEGACY_TABLE_HINTS: &[&str] = &[
    "FORCESCAN",
    "FORCESEEK",
    "HOLDLOCK",
    "INDEX",
    "NOEXPAND",
    "NOLOCK",
    "NOWAIT",
    "PAGLOCK",
    "READCOMMITTED",
    "READCOMMITTEDLOCK",
    "READPAST",
    "READUNCOMMITTED",
    "REPEATABLEREAD",
    "ROWLOCK",
    "SERIALIZABLE",
    "SNAPSHOT",
    "TABLOCK",
    "TABLOCKX",
    "UPDLOCK",
    "XLOCK",
];

const JOIN_WORDS: &[&str] = &["JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "OUTER"];

const JOIN_HINTS: &[&str] = &["LOOP", "HASH", "MERGE", "REMOTE"];

impl TsqlParser {
    /// Whether the current token begins a query expression inside parentheses.
    pub(super) fn at_query_start(&self) -> bool {
        self.base.check_word_ci("SELECT")
    }

    // ========================================================================
    // WITH clause
    // ========================================================================

    /// `WITH name [(columns)] AS (query) [, ...]`
    pub(super) fn parse_with_clause(&mut self) -> Result<WithClause, ParseError> {
        self.require(self.version.supports_cte())?;
        self.base.expect_word_ci("WITH")?;

        let mut ctes = Vec::new();
        if self.base.consume_word_ci("XMLNAMESPACES") {
            self.base.skip_parenthesized()?;
            if !self.base.consume_token(&Token::Comma) {
                return Ok(WithClause { ctes });
            }
        }
        loop {
            let name = self.parse_identifier()?;
            let columns = if self.base.check_token(&Token::LParen) {
                self.parse_column_list()?
            } else {
                Vec::new()
            };
            self.base.expect_word_ci("AS")?;
            self.base.expect_token(&Token::LParen)?;
            let query = self.parse_query_expression()?;
            self.base.expect_token(&Token::RParen)?;
            ctes.push(CommonTableExpression {
                name,
                columns,
                query,
            });
            if !self.base.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(WithClause { ctes })
    }

    // ========================================================================
    // Query expressions
    // ========================================================================

    /// A query with set operations and its ORDER BY / OFFSET / FOR tail.
    pub(super) fn parse_query_expression(&mut self) -> Result<QueryExpression, ParseError> {
        let mut query = self.parse_query_term()?;
        loop {
            let operator = if self.base.consume_word_ci("UNION") {
                SetOperator::Union
            } else if self.base.consume_word_ci("EXCEPT") {
                SetOperator::Except
            } else if self.base.consume_word_ci("INTERSECT") {
                SetOperator::Intersect
            } else {
                break;
            };
            let all = self.base.consume_word_ci("ALL");
            let right = self.parse_query_term()?;
            query = QueryExpression::Binary {
                operator,
                all,
                left: Box::new(query),
                right: Box::new(right),
            };
        }

        self.parse_order_by()?;
        self.skip_for_clause()?;
        Ok(query)
    }

    fn parse_query_term(&mut self) -> Result<QueryExpression, ParseError> {
        if self.base.consume_token(&Token::LParen) {
            let inner = self.parse_query_expression()?;
            self.base.expect_token(&Token::RParen)?;
            return Ok(QueryExpression::Parenthesized(Box::new(inner)));
        }
        Ok(QueryExpression::Specification(Box::new(
            self.parse_query_specification()?,
        )))
    }

    fn parse_query_specification(&mut self) -> Result<QuerySpecification, ParseError> {
        self.base.expect_word_ci("SELECT")?;
        let mut spec = QuerySpecification::default();

        if self.base.consume_word_ci("DISTINCT") {
            spec.distinct = true;
        } else {
            self.base.consume_word_ci("ALL");
        }
        spec.top = self.parse_top_clause()?;

        loop {
            spec.select_elements.push(self.parse_select_element()?);
            if !self.base.consume_token(&Token::Comma) {
                break;
            }
        }

        if self.base.consume_word_ci("INTO") {
            spec.into = Some(self.parse_schema_object_name()?);
        }
        if self.base.consume_word_ci("FROM") {
            spec.from = self.parse_from_list()?;
        }
        spec.selection = self.parse_where_clause()?;

        if self.base.check_word_ci("GROUP") && self.base.peek_word_ci(1, "BY") {
            self.base.advance();
            self.base.advance();
            self.base.consume_word_ci("ALL");
            spec.group_by = self.parse_group_by_list()?;
            if self.base.check_word_ci("WITH")
                && (self.base.peek_word_ci(1, "ROLLUP") || self.base.peek_word_ci(1, "CUBE"))
            {
                self.base.advance();
                self.base.advance();
            }
        }
        if self.base.consume_word_ci("HAVING") {
            spec.having = Some(self.parse_expression()?);
        }
        Ok(spec)
    }

    /// `TOP (expr) [PERCENT] [WITH TIES]` or the legacy `TOP 10`.
    pub(super) fn parse_top_clause(&mut self) -> Result<Option<Expression>, ParseError> {
        if !self.base.consume_word_ci("TOP") {
            return Ok(None);
        }
        let top = if self.base.consume_token(&Token::LParen) {
            let expr = self.parse_expression()?;
            self.base.expect_token(&Token::RParen)?;
            expr
        } else {
            match self.base.next_token() {
                Some(Token::Number(n, _)) => Expression::NumberLiteral(n),
                Some(Token::Word(w)) if w.value.starts_with('@') => Expression::Variable(w.value),
                _ => return Err(self.base.error_expected("TOP count")),
            }
        };
        self.base.consume_word_ci("PERCENT");
        if self.base.check_word_ci("WITH") && self.base.peek_word_ci(1, "TIES") {
            self.base.advance();
            self.base.advance();
        }
        Ok(Some(top))
    }

    fn parse_group_by_list(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut list = Vec::new();
        loop {
            if self.base.check_word_ci("GROUPING") && self.base.peek_word_ci(1, "SETS") {
                self.base.advance();
                self.base.advance();
                self.base.skip_parenthesized()?;
            } else {
                list.push(self.parse_expression()?);
            }
            if !self.base.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(list)
    }

    /// `WHERE expr`, or `WHERE CURRENT OF cursor` (which has no predicate).
    pub(super) fn parse_where_clause(&mut self) -> Result<Option<Expression>, ParseError> {
        if !self.base.consume_word_ci("WHERE") {
            return Ok(None);
        }
        if self.base.check_word_ci("CURRENT") && self.base.peek_word_ci(1, "OF") {
            self.base.advance();
            self.base.advance();
            self.base.consume_word_ci("GLOBAL");
            if self.check_variable() {
                self.parse_variable()?;
            } else {
                self.parse_identifier()?;
            }
            return Ok(None);
        }
        Ok(Some(self.parse_expression()?))
    }

    fn parse_order_by(&mut self) -> Result<(), ParseError> {
        if !(self.base.check_word_ci("ORDER") && self.base.peek_word_ci(1, "BY")) {
            return Ok(());
        }
        self.base.advance();
        self.base.advance();
        loop {
            self.parse_expression()?;
            if !self.base.consume_word_ci("ASC") {
                self.base.consume_word_ci("DESC");
            }
            if !self.base.consume_token(&Token::Comma) {
                break;
            }
        }

        // OFFSET n ROWS [FETCH NEXT n ROWS ONLY]
        if self.base.consume_word_ci("OFFSET") {
            self.parse_expression()?;
            if !self.base.consume_word_ci("ROWS") {
                self.base.expect_word_ci("ROW")?;
            }
            if self.base.consume_word_ci("FETCH") {
                if !self.base.consume_word_ci("NEXT") {
                    self.base.expect_word_ci("FIRST")?;
                }
                self.parse_expression()?;
                if !self.base.consume_word_ci("ROWS") {
                    self.base.expect_word_ci("ROW")?;
                }
                self.base.expect_word_ci("ONLY")?;
            }
        }
        Ok(())
    }

    /// `FOR XML ...`, `FOR JSON ...`, `FOR BROWSE`, `FOR UPDATE [OF cols]`, `FOR READ ONLY`.
    fn skip_for_clause(&mut self) -> Result<(), ParseError> {
        if !self.base.check_word_ci("FOR") {
            return Ok(());
        }
        if self.base.peek_word_ci(1, "UPDATE") {
            self.base.advance();
            self.base.advance();
            if self.base.consume_word_ci("OF") {
                loop {
                    self.parse_multipart_identifier()?;
                    if !self.base.consume_token(&Token::Comma) {
                        break;
                    }
                }
            }
            return Ok(());
        }
        if self.base.peek_word_ci(1, "READ") {
            self.base.advance();
            self.base.advance();
            return self.base.expect_word_ci("ONLY");
        }
        if !["XML", "JSON", "BROWSE"]
            .iter()
            .any(|w| self.base.peek_word_ci(1, w))
        {
            return Ok(());
        }

        self.base.advance();
        // Directive words, their parenthesized arguments and separating commas
        loop {
            match self.base.current() {
                Some(Token::LParen) => self.base.skip_parenthesized()?,
                Some(Token::Comma) => self.base.advance(),
                Some(Token::Word(_))
                    if !self.at_statement_boundary() && !self.base.check_word_ci("OPTION") =>
                {
                    self.base.advance()
                }
                _ => break,
            }
        }
        Ok(())
    }

    // ========================================================================
    // Select list
    // ========================================================================

    fn parse_select_element(&mut self) -> Result<SelectElement, ParseError> {
        if self.base.consume_token(&Token::Mul) {
            return Ok(SelectElement::Wildcard {
                qualifier: Vec::new(),
            });
        }
        if let Some(qualifier) = self.parse_qualified_wildcard()? {
            return Ok(SelectElement::Wildcard { qualifier });
        }

        // @v = expr, @v += expr
        if self.check_variable() {
            if let Some(width) = self.assignment_operator_width(1) {
                let variable = self.parse_variable()?;
                for _ in 0..width {
                    self.base.advance();
                }
                let expression = self.parse_expression()?;
                return Ok(SelectElement::SetVariable {
                    variable,
                    expression,
                });
            }
        }

        // alias = expr
        let named = match self.base.current() {
            Some(Token::SingleQuotedString(s)) => Some(s.clone()),
            Some(Token::Word(w)) if self.base.current().is_some_and(is_identifier_token) => {
                Some(w.value.clone())
            }
            _ => None,
        };
        if let Some(alias) = named {
            if self.base.peek_token(1, &Token::Eq) {
                self.base.advance();
                self.base.advance();
                let expression = self.parse_expression()?;
                return Ok(SelectElement::Expression {
                    expression,
                    alias: Some(alias),
                });
            }
        }

        let expression = self.parse_expression()?;
        let alias = match self.base.current() {
            Some(Token::SingleQuotedString(s)) => {
                let alias = s.clone();
                self.base.advance();
                Some(alias)
            }
            _ => self.parse_optional_alias()?,
        };
        Ok(SelectElement::Expression { expression, alias })
    }

    /// `t.*` or `dbo.t.*`. Leaves the position untouched when not a wildcard.
    fn parse_qualified_wildcard(&mut self) -> Result<Option<Vec<String>>, ParseError> {
        let mut offset = 0;
        while matches!(self.base.peek(offset), Some(Token::Word(_)))
            && self.base.peek_token(offset + 1, &Token::Period)
        {
            offset += 2;
        }
        if offset == 0 || !self.base.peek_token(offset, &Token::Mul) {
            return Ok(None);
        }

        let mut qualifier = Vec::new();
        while !self.base.check_token(&Token::Mul) {
            if let Some(Token::Word(w)) = self.base.next_token() {
                qualifier.push(w.value);
            }
            self.base.expect_token(&Token::Period)?;
        }
        self.base.advance();
        Ok(Some(qualifier))
    }

    // ========================================================================
    // Table sources
    // ========================================================================

    /// Comma-separated table references of a FROM clause.
    pub(super) fn parse_from_list(&mut self) -> Result<Vec<TableFactor>, ParseError> {
        let mut from = vec![self.parse_table_reference()?];
        while self.base.consume_token(&Token::Comma) {
            from.push(self.parse_table_reference()?);
        }
        Ok(from)
    }

    /// A table factor followed by any number of joins, built left-deep.
    pub(super) fn parse_table_reference(&mut self) -> Result<TableFactor, ParseError> {
        let first = self.parse_table_factor()?;
        self.parse_joins(first)
    }

    fn parse_joins(&mut self, mut left: TableFactor) -> Result<TableFactor, ParseError> {
        while let Some(kind) = self.parse_join_operator()? {
            let mut right = self.parse_table_factor()?;
            let condition = if matches!(kind, JoinKind::Cross | JoinKind::CrossApply | JoinKind::OuterApply)
            {
                None
            } else {
                // a JOIN b JOIN c ON b.x = c.x ON a.y = b.y
                if !self.base.check_word_ci("ON") && self.check_any_word_ci(JOIN_WORDS) {
                    right = self.parse_joins(right)?;
                }
                self.base.expect_word_ci("ON")?;
                Some(self.parse_expression()?)
            };
            left = TableFactor::Join(Box::new(JoinTableReference {
                kind,
                first: left,
                second: right,
                condition,
            }));
        }
        Ok(left)
    }

    fn parse_join_operator(&mut self) -> Result<Option<JoinKind>, ParseError> {
        if !self.check_any_word_ci(JOIN_WORDS) {
            return Ok(None);
        }
        if self.base.consume_word_ci("CROSS") {
            if self.base.consume_word_ci("APPLY") {
                return Ok(Some(JoinKind::CrossApply));
            }
            self.base.expect_word_ci("JOIN")?;
            return Ok(Some(JoinKind::Cross));
        }
        if self.base.check_word_ci("OUTER") && self.base.peek_word_ci(1, "APPLY") {
            self.base.advance();
            self.base.advance();
            return Ok(Some(JoinKind::OuterApply));
        }

        let kind = if self.base.consume_word_ci("LEFT") {
            JoinKind::LeftOuter
        } else if self.base.consume_word_ci("RIGHT") {
            JoinKind::RightOuter
        } else if self.base.consume_word_ci("FULL") {
            JoinKind::FullOuter
        } else {
            self.base.consume_word_ci("INNER");
            JoinKind::Inner
        };
        if kind != JoinKind::Inner {
            self.base.consume_word_ci("OUTER");
        }
        if self.check_any_word_ci(JOIN_HINTS) {
            self.base.advance();
        }
        self.base.expect_word_ci("JOIN")?;
        Ok(Some(kind))
    }

    fn parse_table_factor(&mut self) -> Result<TableFactor, ParseError> {
        let factor = match self.base.current() {
            Some(Token::LParen) => self.parse_parenthesized_table_factor()?,
            _ if self.check_variable() => self.parse_variable_table_factor()?,
            _ if self.check_any_word_ci(ROWSET_FUNCTIONS) => {
                let name = self.parse_rowset_function_name()?;
                self.base.skip_parenthesized()?;
                self.skip_table_hints()?;
                let alias = self.parse_optional_alias()?;
                self.skip_derived_column_list()?;
                TableFactor::Function {
                    name,
                    arguments: Vec::new(),
                    alias,
                }
            }
            _ => self.parse_named_table_factor()?,
        };
        self.skip_pivots()?;
        Ok(factor)
    }

    fn parse_rowset_function_name(&mut self) -> Result<SchemaObjectName, ParseError> {
        match self.base.next_token() {
            Some(Token::Word(w)) => Ok(SchemaObjectName::new([w.value])),
            _ => Err(self.base.error_unexpected()),
        }
    }

    fn parse_named_table_factor(&mut self) -> Result<TableFactor, ParseError> {
        let name = self.parse_schema_object_name()?;

        if self.base.check_token(&Token::LParen) && !self.legacy_hint_follows() {
            let arguments = self.parse_table_function_arguments()?;
            self.skip_table_hints()?;
            let alias = self.parse_optional_alias()?;
            self.skip_derived_column_list()?;
            self.skip_table_hints()?;
            return Ok(TableFactor::Function {
                name,
                arguments,
                alias,
            });
        }

        self.skip_temporal_clause()?;
        if self.base.check_word_ci("TABLESAMPLE") {
            self.base.advance();
            self.base.consume_word_ci("SYSTEM");
            self.base.skip_parenthesized()?;
            if self.base.consume_word_ci("REPEATABLE") {
                self.base.skip_parenthesized()?;
            }
        }
        self.skip_table_hints()?;
        let alias = self.parse_optional_alias()?;
        self.skip_table_hints()?;
        Ok(TableFactor::Named { name, alias })
    }

    /// Arguments of a table-valued function call. Arguments that are not plain
    /// expressions (e.g. `OPENJSON` paths with options) are skipped.
    fn parse_table_function_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        let start = self.base.pos();
        self.base.expect_token(&Token::LParen)?;
        if self.base.consume_token(&Token::RParen) {
            return Ok(Vec::new());
        }
        if let Ok(arguments) = self.parse_expression_list() {
            if self.base.consume_token(&Token::RParen) {
                return Ok(arguments);
            }
        }
        self.base.set_pos(start);
        self.base.skip_parenthesized()?;
        Ok(Vec::new())
    }

    /// `@t [AS] alias`, or an XML method such as `@doc.nodes('/a') AS n(c)`.
    fn parse_variable_table_factor(&mut self) -> Result<TableFactor, ParseError> {
        let name = self.parse_variable()?;
        if self.base.check_token(&Token::Period) && self.base.peek_token(2, &Token::LParen) {
            self.base.advance();
            let method = match self.base.next_token() {
                Some(Token::Word(w)) => w.value,
                _ => return Err(self.base.error_unexpected()),
            };
            let arguments = self.parse_table_function_arguments()?;
            let alias = self.parse_optional_alias()?;
            self.skip_derived_column_list()?;
            return Ok(TableFactor::Function {
                name: SchemaObjectName::new([name, method]),
                arguments,
                alias,
            });
        }
        self.skip_table_hints()?;
        let alias = self.parse_optional_alias()?;
        self.skip_table_hints()?;
        Ok(TableFactor::Variable { name, alias })
    }

    /// Derived table, inline VALUES, or a parenthesized join.
    fn parse_parenthesized_table_factor(&mut self) -> Result<TableFactor, ParseError> {
        let start = self.base.pos();

        if self.base.peek_word_ci(1, "VALUES") {
            self.base.skip_parenthesized()?;
            let alias = self.parse_optional_alias()?;
            self.skip_derived_column_list()?;
            return Ok(TableFactor::Values { alias });
        }

        let query_follows = self.base.peek_word_ci(1, "SELECT");
        if query_follows || self.base.peek_token(1, &Token::LParen) {
            self.base.advance();
            let derived = self
                .parse_query_expression()
                .and_then(|query| self.base.expect_token(&Token::RParen).map(|_| query));
            match derived {
                Ok(query) => {
                    let alias = self.parse_optional_alias()?;
                    self.skip_derived_column_list()?;
                    return Ok(TableFactor::Derived {
                        query: Box::new(query),
                        alias,
                    });
                }
                Err(e) if query_follows => return Err(e),
                // ((a JOIN b ON ...) JOIN c ON ...)
                Err(_) => self.base.set_pos(start),
            }
        }

        self.base.expect_token(&Token::LParen)?;
        let inner = self.parse_table_reference()?;
        self.base.expect_token(&Token::RParen)?;
        Ok(inner)
    }

    /// Whether `(` at the current position opens a legacy table hint list.
    fn legacy_hint_follows(&self) -> bool {
        self.base.check_token(&Token::LParen)
            && LEGACY_TABLE_HINTS
                .iter()
                .any(|hint| self.base.peek_word_ci(1, hint))
    }

    /// `WITH (NOLOCK, INDEX(ix))` or the legacy `(NOLOCK)`.
    pub(super) fn skip_table_hints(&mut self) -> Result<(), ParseError> {
        loop {
            if self.base.check_word_ci("WITH") && self.base.peek_token(1, &Token::LParen) {
                self.base.advance();
                self.base.skip_parenthesized()?;
            } else if self.legacy_hint_follows() {
                self.base.skip_parenthesized()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_derived_column_list(&mut self) -> Result<(), ParseError> {
        if self.base.check_token(&Token::LParen) {
            self.base.skip_parenthesized()?;
        }
        Ok(())
    }

    /// `FOR SYSTEM_TIME AS OF x | FROM x TO y | BETWEEN x AND y | CONTAINED IN (x, y) | ALL`
    fn skip_temporal_clause(&mut self) -> Result<(), ParseError> {
        if !(self.base.check_word_ci("FOR") && self.base.peek_word_ci(1, "SYSTEM_TIME")) {
            return Ok(());
        }
        self.base.advance();
        self.base.advance();
        if self.base.consume_word_ci("ALL") {
            return Ok(());
        }
        if self.base.consume_word_ci("CONTAINED") {
            self.base.expect_word_ci("IN")?;
            return self.base.skip_parenthesized();
        }
        if self.base.consume_word_ci("AS") {
            self.base.expect_word_ci("OF")?;
            self.base.advance();
            return Ok(());
        }
        let between = self.base.consume_word_ci("BETWEEN");
        if !between {
            self.base.expect_word_ci("FROM")?;
        }
        self.base.advance();
        self.base.expect_word_ci(if between { "AND" } else { "TO" })?;
        self.base.advance();
        Ok(())
    }

    /// `PIVOT (...) AS p` and `UNPIVOT (...) AS u` following a table source.
    fn skip_pivots(&mut self) -> Result<(), ParseError> {
        while self.check_any_word_ci(&["PIVOT", "UNPIVOT"]) && self.base.peek_token(1, &Token::LParen)
        {
            self.base.advance();
            self.base.skip_parenthesized()?;
            self.parse_optional_alias()?;
        }
        Ok(())
    }
}
