//! Statement grammar: procedures, control flow, variables, DML and EXECUTE.
//!
//! ## Modeled statements
//!
//! ```sql
//! CREATE [OR ALTER] PROC[EDURE] dbo.p @a INT = 0, @b INT OUTPUT AS ...
//! BEGIN ... END / BEGIN TRY ... END TRY BEGIN CATCH ... END CATCH
//! IF ... [ELSE ...] / WHILE ...
//! DECLARE @v INT [= expr], @t TABLE (...)
//! SET @v = expr
//! [WITH ...] SELECT | INSERT | UPDATE | DELETE | MERGE
//! EXEC[UTE] [@rc =] dbo.p args | EXEC (@sql + '...')
//! ```
//!
//! Anything else (DDL, SET options, transactions, PRINT, cursors, ...) is consumed
//! up to the next statement and returned as [`Statement::Other`].

use sqlparser::tokenizer::Token;

use super::identifier_utils::{
    is_identifier_token, is_statement_start, is_variable_token, unquoted_word,
};
use super::tsql_parser::TsqlParser;
use crate::ast::{
    BeginEndBlockStatement, BinaryOperator, CreateProcedureStatement, DeclareVariableElement,
    DeclareVariableStatement, DeleteStatement, DmlTarget, ExecutableEntity, ExecuteStatement,
    ExecuteString, Expression, IfStatement, InsertSource, InsertStatement, MergeAction,
    MergeClause, MergeClauseKind, MergeStatement, OtherStatement, ProcedureParameter,
    SelectStatement, SetClause, SetVariableStatement, Statement, TryCatchStatement,
    UpdateStatement, WhileStatement, WithClause,
};
use crate::error::ParseError;

/// Leading words of statements that are consumed without being modeled.
const OTHER_STATEMENT_WORDS: &[&str] = &[
    "BACKUP",
    "BREAK",
    "BULK",
    "CHECKPOINT",
    "CLOSE",
    "COMMIT",
    "CONTINUE",
    "DBCC",
    "DEALLOCATE",
    "DISABLE",
    "DROP",
    "ENABLE",
    "FETCH",
    "GET",
    "GOTO",
    "KILL",
    "MOVE",
    "OPEN",
    "PRINT",
    "RAISERROR",
    "READTEXT",
    "RECEIVE",
    "RECONFIGURE",
    "RESTORE",
    "RETURN",
    "REVERT",
    "ROLLBACK",
    "SAVE",
    "SEND",
    "SETUSER",
    "SHUTDOWN",
    "THROW",
    "TRUNCATE",
    "UPDATETEXT",
    "USE",
    "WAITFOR",
    "WRITETEXT",
];

/// Leading words whose second word is part of the statement's kind (`SET NOCOUNT`, `DROP TABLE`).
const QUALIFIED_STATEMENT_WORDS: &[&str] = &[
    "BEGIN",
    "BULK",
    "COMMIT",
    "DISABLE",
    "DROP",
    "ENABLE",
    "END",
    "EXEC",
    "EXECUTE",
    "ROLLBACK",
    "SAVE",
    "SET",
    "TRUNCATE",
    "UPDATE",
];

/// Objects whose definition runs to the end of the batch.
const BATCH_BODY_OBJECTS: &[&str] = &["VIEW", "FUNCTION", "TRIGGER"];

impl TsqlParser {
    pub(super) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let word = match self.base.current() {
            Some(Token::LParen) => return self.parse_select_statement(None),
            Some(token) => match unquoted_word(token) {
                Some(w) => w.to_ascii_uppercase(),
                None => return Err(self.base.error_unexpected()),
            },
            None => return Err(self.base.error_expected("statement")),
        };

        if self.base.peek_token(1, &Token::Colon) && self.base.current().is_some_and(is_identifier_token)
        {
            self.base.advance();
            self.base.advance();
            return Ok(other("LABEL"));
        }

        match word.as_str() {
            "CREATE" | "ALTER" => self.parse_create_or_alter(),
            "BEGIN" => self.parse_begin(),
            "IF" => self.parse_if(),
            "WHILE" => self.parse_while(),
            "DECLARE" => self.parse_declare(),
            "SET" => self.parse_set(),
            "SELECT" => self.parse_select_statement(None),
            "INSERT" => self.parse_insert(None),
            "UPDATE" if self.base.peek_word_ci(1, "STATISTICS") => self.parse_other_statement(),
            "UPDATE" => self.parse_update(None),
            "DELETE" => self.parse_delete(None),
            "MERGE" => self.parse_merge(None),
            "EXEC" | "EXECUTE" => self.parse_execute_statement(),
            "WITH" if self.at_cte_start() => self.parse_with_statement(),
            "GRANT" | "DENY" | "REVOKE" => self.parse_permission_statement(),
            "END" if self.base.peek_word_ci(1, "CONVERSATION") => self.parse_other_statement(),
            w if OTHER_STATEMENT_WORDS.contains(&w) => self.parse_other_statement(),
            _ => Err(self.base.error_unexpected()),
        }
    }

    /// `END` closing a block (not `END CONVERSATION`).
    fn at_block_end(&self) -> bool {
        self.base.check_word_ci("END") && !self.base.peek_word_ci(1, "CONVERSATION")
    }

    /// Consume an unmodeled statement, naming it by its leading keywords.
    fn parse_other_statement(&mut self) -> Result<Statement, ParseError> {
        let mut kind = match self.base.next_token() {
            Some(token) => unquoted_word(&token).unwrap_or_default().to_ascii_uppercase(),
            None => return Err(self.base.error_expected("statement")),
        };
        if kind == "BULK" && self.base.consume_word_ci("INSERT") {
            kind.push_str(" INSERT");
        } else if QUALIFIED_STATEMENT_WORDS.contains(&kind.as_str()) && !self.at_statement_boundary()
        {
            if let Some(second) = self.base.current().and_then(unquoted_word) {
                if !second.starts_with('@') {
                    kind = format!("{} {}", kind, second.to_ascii_uppercase());
                }
            }
        }
        self.skip_statement_remainder();
        Ok(other(kind))
    }

    /// GRANT/DENY/REVOKE: the permission list may name statement keywords.
    fn parse_permission_statement(&mut self) -> Result<Statement, ParseError> {
        let kind = match self.base.next_token() {
            Some(token) => unquoted_word(&token).unwrap_or_default().to_ascii_uppercase(),
            None => return Err(self.base.error_expected("statement")),
        };
        while !self.base.is_at_end() && !self.check_any_word_ci(&["ON", "TO", "FROM"]) {
            self.base.advance();
        }
        self.skip_statement_remainder();
        Ok(other(kind))
    }

    // ========================================================================
    // CREATE / ALTER
    // ========================================================================

    fn parse_create_or_alter(&mut self) -> Result<Statement, ParseError> {
        let verb = if self.base.consume_word_ci("ALTER") {
            "ALTER"
        } else {
            self.base.expect_word_ci("CREATE")?;
            "CREATE"
        };

        let mut is_alter = verb == "ALTER";
        if !is_alter && self.base.check_word_ci("OR") && self.base.peek_word_ci(1, "ALTER") {
            self.require(self.version.supports_create_or_alter())?;
            self.base.advance();
            self.base.advance();
            is_alter = true;
        }

        if self.check_any_word_ci(&["PROC", "PROCEDURE"]) {
            self.base.advance();
            return self.parse_procedure_definition(is_alter).map(Statement::CreateProcedure);
        }

        if self.check_any_word_ci(BATCH_BODY_OBJECTS) {
            let object = unquoted_word_at(self).unwrap_or_default();
            self.base.skip_to_end();
            return Ok(other(format!("{} {}", verb, object)));
        }

        let kind = match unquoted_word_at(self) {
            Some(object) if !self.at_statement_boundary() => format!("{} {}", verb, object),
            _ => verb.to_string(),
        };
        self.skip_statement_remainder();
        Ok(other(kind))
    }

    /// Procedure definition after `CREATE PROCEDURE`; the body runs to the end of the batch.
    fn parse_procedure_definition(
        &mut self,
        is_alter: bool,
    ) -> Result<CreateProcedureStatement, ParseError> {
        let name = self.parse_schema_object_name()?;
        // Numbered procedures: dbo.p;2
        if self.base.check_token(&Token::SemiColon) && matches!(self.base.peek(1), Some(Token::Number(_, _)))
        {
            self.base.advance();
            self.base.advance();
        }

        let parenthesized = self.base.consume_token(&Token::LParen);
        let mut parameters = Vec::new();
        if self.check_variable() {
            loop {
                parameters.push(self.parse_procedure_parameter()?);
                if !self.base.consume_token(&Token::Comma) {
                    break;
                }
            }
        }
        if parenthesized {
            self.base.expect_token(&Token::RParen)?;
        }

        if self.base.consume_word_ci("WITH") {
            loop {
                if self.check_any_word_ci(&["EXECUTE", "EXEC"]) {
                    self.base.advance();
                    self.base.expect_word_ci("AS")?;
                }
                self.base.advance();
                if !self.base.consume_token(&Token::Comma) {
                    break;
                }
            }
        }
        if self.base.check_word_ci("FOR") && self.base.peek_word_ci(1, "REPLICATION") {
            self.base.advance();
            self.base.advance();
        }
        self.base.expect_word_ci("AS")?;

        let statements = if self.base.check_word_ci("EXTERNAL") {
            self.base.skip_to_end();
            Vec::new()
        } else {
            self.parse_statement_list(|_| false)?
        };

        Ok(CreateProcedureStatement {
            name,
            is_alter,
            parameters,
            statements,
        })
    }

    /// `@name [AS] type [VARYING] [= default] [OUT | OUTPUT] [READONLY]`
    fn parse_procedure_parameter(&mut self) -> Result<ProcedureParameter, ParseError> {
        let name = self.parse_variable()?;
        self.base.consume_word_ci("AS");
        let data_type = self.parse_data_type()?;
        let default_value = if self.base.consume_token(&Token::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let is_output = self.check_any_word_ci(&["OUT", "OUTPUT"]);
        if is_output {
            self.base.advance();
        }
        self.base.consume_word_ci("READONLY");
        Ok(ProcedureParameter {
            name,
            data_type,
            default_value,
            is_output,
        })
    }

    // ========================================================================
    // Blocks and control flow
    // ========================================================================

    fn parse_begin(&mut self) -> Result<Statement, ParseError> {
        if self.base.peek_word_ci(1, "TRY") {
            return self.parse_try_catch();
        }
        if ["TRAN", "TRANSACTION", "DISTRIBUTED", "DIALOG", "CONVERSATION"]
            .iter()
            .any(|w| self.base.peek_word_ci(1, w))
        {
            return self.parse_other_statement();
        }

        self.base.expect_word_ci("BEGIN")?;
        // BEGIN ATOMIC WITH (...) in natively compiled procedures
        if self.base.consume_word_ci("ATOMIC") {
            self.skip_table_hints()?;
        }
        let statements = self.parse_statement_list(Self::at_block_end)?;
        self.base.expect_word_ci("END")?;
        Ok(Statement::BeginEndBlock(BeginEndBlockStatement { statements }))
    }

    fn parse_try_catch(&mut self) -> Result<Statement, ParseError> {
        self.require(self.version.supports_try_catch())?;
        self.base.expect_word_ci("BEGIN")?;
        self.base.expect_word_ci("TRY")?;
        let try_statements = self.parse_statement_list(Self::at_block_end)?;
        self.base.expect_word_ci("END")?;
        self.base.expect_word_ci("TRY")?;

        self.base.expect_word_ci("BEGIN")?;
        self.base.expect_word_ci("CATCH")?;
        let catch_statements = self.parse_statement_list(Self::at_block_end)?;
        self.base.expect_word_ci("END")?;
        self.base.expect_word_ci("CATCH")?;

        Ok(Statement::TryCatch(TryCatchStatement {
            try_statements,
            catch_statements,
        }))
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        self.base.expect_word_ci("IF")?;
        let predicate = self.parse_expression()?;
        let then_statement = Box::new(self.parse_statement()?);

        // ELSE may follow a semicolon
        let before_else = self.base.pos();
        while self.base.consume_token(&Token::SemiColon) {}
        let else_statement = if self.base.consume_word_ci("ELSE") {
            Some(Box::new(self.parse_statement()?))
        } else {
            self.base.set_pos(before_else);
            None
        };

        Ok(Statement::If(IfStatement {
            predicate,
            then_statement,
            else_statement,
        }))
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        self.base.expect_word_ci("WHILE")?;
        let predicate = self.parse_expression()?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { predicate, body }))
    }

    // ========================================================================
    // Variables
    // ========================================================================

    fn parse_declare(&mut self) -> Result<Statement, ParseError> {
        self.base.expect_word_ci("DECLARE")?;
        if !self.check_variable() {
            return self.parse_cursor_declaration();
        }

        let mut declarations = Vec::new();
        loop {
            let name = self.parse_variable()?;
            self.base.consume_word_ci("AS");
            let data_type = if self.base.consume_word_ci("TABLE") {
                self.base.skip_parenthesized()?;
                "TABLE".to_string()
            } else if self.base.consume_word_ci("CURSOR") {
                "CURSOR".to_string()
            } else {
                self.parse_data_type()?
            };

            let initializer = if self.base.check_token(&Token::Eq) {
                self.require(self.version.supports_declare_initializer())?;
                self.base.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };

            declarations.push(DeclareVariableElement {
                name,
                data_type,
                initializer,
            });
            if !self.base.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(Statement::DeclareVariable(DeclareVariableStatement {
            declarations,
        }))
    }

    /// `DECLARE name CURSOR [options] FOR select [FOR UPDATE ...]`
    fn parse_cursor_declaration(&mut self) -> Result<Statement, ParseError> {
        self.parse_identifier()?;
        self.skip_cursor_definition()?;
        Ok(other("DECLARE CURSOR"))
    }

    /// Cursor options and query, up to the end of the cursor's SELECT.
    fn skip_cursor_definition(&mut self) -> Result<(), ParseError> {
        while !self.base.is_at_end() && !self.base.check_word_ci("FOR") {
            self.base.advance();
        }
        self.base.expect_word_ci("FOR")?;
        self.parse_query_expression()?;
        Ok(())
    }

    fn parse_set(&mut self) -> Result<Statement, ParseError> {
        let assignment = self
            .base
            .peek(1)
            .is_some_and(is_variable_token)
            .then(|| self.assignment_operator_width(2))
            .flatten();
        let Some(width) = assignment else {
            // SET NOCOUNT ON, SET @xml.modify(...), ...
            return self.parse_other_statement();
        };

        self.base.expect_word_ci("SET")?;
        let variable = self.parse_variable()?;
        for _ in 0..width {
            self.base.advance();
        }

        let expression = if self.base.consume_word_ci("CURSOR") {
            self.skip_cursor_definition()?;
            Expression::Other("CURSOR".to_string())
        } else {
            self.parse_expression()?
        };
        Ok(Statement::SetVariable(SetVariableStatement {
            variable,
            expression,
        }))
    }

    // ========================================================================
    // Queries and data modification
    // ========================================================================

    /// Statement introduced by a WITH clause.
    fn parse_with_statement(&mut self) -> Result<Statement, ParseError> {
        let with = Some(self.parse_with_clause()?);
        match self.base.current().and_then(unquoted_word).map(str::to_ascii_uppercase) {
            Some(w) if w == "SELECT" => self.parse_select_statement(with),
            Some(w) if w == "INSERT" => self.parse_insert(with),
            Some(w) if w == "UPDATE" => self.parse_update(with),
            Some(w) if w == "DELETE" => self.parse_delete(with),
            Some(w) if w == "MERGE" => self.parse_merge(with),
            _ if self.base.check_token(&Token::LParen) => self.parse_select_statement(with),
            _ => Err(self.base.error_unexpected()),
        }
    }

    fn parse_select_statement(&mut self, with: Option<WithClause>) -> Result<Statement, ParseError> {
        let query = self.parse_query_expression()?;
        self.skip_query_options()?;
        Ok(Statement::Select(SelectStatement { with, query }))
    }

    /// Table or table variable written to by a DML statement.
    fn parse_dml_target(&mut self) -> Result<DmlTarget, ParseError> {
        if self.check_variable() {
            Ok(DmlTarget::Variable(self.parse_variable()?))
        } else {
            Ok(DmlTarget::Table(self.parse_schema_object_name()?))
        }
    }

    /// `OUTPUT select_list [INTO target [(columns)]]`, possibly repeated.
    fn skip_output_clause(&mut self) -> Result<(), ParseError> {
        while self.base.consume_word_ci("OUTPUT") {
            loop {
                self.parse_select_element_for_output()?;
                if !self.base.consume_token(&Token::Comma) {
                    break;
                }
            }
            if self.base.consume_word_ci("INTO") {
                self.parse_dml_target()?;
                if self.base.check_token(&Token::LParen) {
                    self.base.skip_parenthesized()?;
                }
            }
        }
        Ok(())
    }

    /// `inserted.*`, `deleted.id AS old_id`, `$action`
    fn parse_select_element_for_output(&mut self) -> Result<(), ParseError> {
        while matches!(self.base.current(), Some(Token::Word(_)))
            && self.base.peek_token(1, &Token::Period)
        {
            self.base.advance();
            self.base.advance();
        }
        if self.base.consume_token(&Token::Mul) {
            return Ok(());
        }
        self.parse_expression()?;
        self.parse_optional_alias()?;
        Ok(())
    }

    fn parse_insert(&mut self, with: Option<WithClause>) -> Result<Statement, ParseError> {
        self.base.expect_word_ci("INSERT")?;
        self.parse_top_clause()?;
        self.base.consume_word_ci("INTO");
        let target = self.parse_dml_target()?;
        self.skip_table_hints()?;

        let columns = if self.base.check_token(&Token::LParen) && !self.base.peek_word_ci(1, "SELECT")
        {
            self.parse_column_list()?
        } else {
            Vec::new()
        };
        self.skip_output_clause()?;

        let source = if self.base.consume_word_ci("VALUES") {
            let mut rows = Vec::new();
            loop {
                self.base.expect_token(&Token::LParen)?;
                rows.push(self.parse_expression_list()?);
                self.base.expect_token(&Token::RParen)?;
                if !self.base.consume_token(&Token::Comma) {
                    break;
                }
            }
            InsertSource::Values(rows)
        } else if self.base.check_word_ci("DEFAULT") && self.base.peek_word_ci(1, "VALUES") {
            self.base.advance();
            self.base.advance();
            InsertSource::DefaultValues
        } else if self.check_any_word_ci(&["EXEC", "EXECUTE"]) {
            self.base.advance();
            InsertSource::Execute(self.parse_execute_body()?)
        } else if self.at_query_start() || self.base.check_token(&Token::LParen) {
            InsertSource::Query(self.parse_query_expression()?)
        } else {
            return Err(self.base.error_unexpected());
        };
        self.skip_query_options()?;

        Ok(Statement::Insert(InsertStatement {
            with,
            target,
            columns,
            source,
        }))
    }

    fn parse_update(&mut self, with: Option<WithClause>) -> Result<Statement, ParseError> {
        self.base.expect_word_ci("UPDATE")?;
        self.parse_top_clause()?;
        let target = self.parse_dml_target()?;
        self.skip_table_hints()?;

        self.base.expect_word_ci("SET")?;
        let mut set_clauses = Vec::new();
        loop {
            set_clauses.push(self.parse_set_clause()?);
            if !self.base.consume_token(&Token::Comma) {
                break;
            }
        }
        self.skip_output_clause()?;

        let from = if self.base.consume_word_ci("FROM") {
            self.parse_from_list()?
        } else {
            Vec::new()
        };
        let selection = self.parse_where_clause()?;
        self.skip_query_options()?;

        Ok(Statement::Update(UpdateStatement {
            with,
            target,
            set_clauses,
            from,
            selection,
        }))
    }

    /// `col = expr`, `t.col += expr`, `@v = col = expr`, `col.WRITE(...)`
    fn parse_set_clause(&mut self) -> Result<SetClause, ParseError> {
        let column = if self.check_variable() {
            vec![self.parse_variable()?]
        } else {
            self.parse_multipart_identifier()?
        };

        if self.base.check_token(&Token::LParen) {
            // Mutator method such as col.WRITE(@v, 0, NULL) or xml.modify('...')
            let method = column.last().cloned().unwrap_or_default();
            self.base.skip_parenthesized()?;
            return Ok(SetClause {
                column,
                expression: Expression::Other(method),
            });
        }

        let Some(width) = self.assignment_operator_width(0) else {
            return Err(self.base.error_expected("="));
        };
        for _ in 0..width {
            self.base.advance();
        }
        let expression = self.parse_expression()?;
        Ok(SetClause { column, expression })
    }

    fn parse_delete(&mut self, with: Option<WithClause>) -> Result<Statement, ParseError> {
        self.base.expect_word_ci("DELETE")?;
        self.parse_top_clause()?;
        self.base.consume_word_ci("FROM");
        let target = self.parse_dml_target()?;
        self.skip_table_hints()?;
        self.skip_output_clause()?;

        let from = if self.base.consume_word_ci("FROM") {
            self.parse_from_list()?
        } else {
            Vec::new()
        };
        let selection = self.parse_where_clause()?;
        self.skip_query_options()?;

        Ok(Statement::Delete(DeleteStatement {
            with,
            target,
            from,
            selection,
        }))
    }

    fn parse_merge(&mut self, with: Option<WithClause>) -> Result<Statement, ParseError> {
        self.require(self.version.supports_merge())?;
        self.base.expect_word_ci("MERGE")?;
        self.parse_top_clause()?;
        self.base.consume_word_ci("INTO");
        let target = self.parse_dml_target()?;
        self.skip_table_hints()?;
        let target_alias = self.parse_optional_alias()?;

        self.base.expect_word_ci("USING")?;
        let source = self.parse_table_reference()?;
        self.base.expect_word_ci("ON")?;
        let on = self.parse_expression()?;

        let mut clauses = Vec::new();
        while self.base.consume_word_ci("WHEN") {
            clauses.push(self.parse_merge_clause()?);
        }
        if clauses.is_empty() {
            return Err(self.base.error_expected("WHEN"));
        }
        self.skip_output_clause()?;
        self.skip_query_options()?;

        Ok(Statement::Merge(Box::new(MergeStatement {
            with,
            target,
            target_alias,
            source,
            on,
            clauses,
        })))
    }

    /// One `WHEN [NOT] MATCHED [BY TARGET | BY SOURCE] [AND cond] THEN action`.
    fn parse_merge_clause(&mut self) -> Result<MergeClause, ParseError> {
        let kind = if self.base.consume_word_ci("MATCHED") {
            MergeClauseKind::Matched
        } else {
            self.base.expect_word_ci("NOT")?;
            self.base.expect_word_ci("MATCHED")?;
            if self.base.consume_word_ci("BY") {
                if self.base.consume_word_ci("SOURCE") {
                    MergeClauseKind::NotMatchedBySource
                } else {
                    self.base.expect_word_ci("TARGET")?;
                    MergeClauseKind::NotMatchedByTarget
                }
            } else {
                MergeClauseKind::NotMatchedByTarget
            }
        };

        let predicate = if self.base.consume_word_ci("AND") {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.base.expect_word_ci("THEN")?;

        let action = if self.base.consume_word_ci("UPDATE") {
            self.base.expect_word_ci("SET")?;
            let mut set_clauses = Vec::new();
            loop {
                set_clauses.push(self.parse_set_clause()?);
                if !self.base.consume_token(&Token::Comma) {
                    break;
                }
            }
            MergeAction::Update(set_clauses)
        } else if self.base.consume_word_ci("DELETE") {
            MergeAction::Delete
        } else {
            self.base.expect_word_ci("INSERT")?;
            let columns = if self.base.check_token(&Token::LParen) {
                self.parse_column_list()?
            } else {
                Vec::new()
            };
            let values = if self.base.consume_word_ci("DEFAULT") {
                self.base.expect_word_ci("VALUES")?;
                None
            } else {
                self.base.expect_word_ci("VALUES")?;
                self.base.expect_token(&Token::LParen)?;
                let values = self.parse_expression_list()?;
                self.base.expect_token(&Token::RParen)?;
                Some(values)
            };
            MergeAction::Insert { columns, values }
        };

        Ok(MergeClause {
            kind,
            predicate,
            action,
        })
    }

    // ========================================================================
    // EXECUTE
    // ========================================================================

    fn parse_execute_statement(&mut self) -> Result<Statement, ParseError> {
        if self.base.peek_word_ci(1, "AS") {
            // EXECUTE AS USER = '...'
            return self.parse_other_statement();
        }
        self.base.advance();
        Ok(Statement::Execute(self.parse_execute_body()?))
    }

    /// Everything after `EXEC`/`EXECUTE`.
    fn parse_execute_body(&mut self) -> Result<ExecuteStatement, ParseError> {
        if self.base.consume_token(&Token::LParen) {
            let batch = self.parse_expression()?;
            // Linked-server pass-through parameters
            while self.base.consume_token(&Token::Comma) {
                self.parse_expression()?;
            }
            self.base.expect_token(&Token::RParen)?;
            self.skip_execute_context()?;

            let mut strings = Vec::new();
            collect_execute_strings(batch, &mut strings);
            return Ok(ExecuteStatement {
                entity: ExecutableEntity::Strings(strings),
            });
        }

        let entity = if self.check_variable() && !self.base.peek_token(1, &Token::Eq) {
            let variable = self.parse_variable()?;
            self.parse_execute_parameters()?;
            ExecutableEntity::ProcedureVariable(variable)
        } else {
            let return_variable = if self.check_variable() {
                let variable = self.parse_variable()?;
                self.base.expect_token(&Token::Eq)?;
                Some(variable)
            } else {
                None
            };
            if self.check_variable() {
                let variable = self.parse_variable()?;
                self.parse_execute_parameters()?;
                ExecutableEntity::ProcedureVariable(variable)
            } else {
                let name = self.parse_schema_object_name()?;
                let parameters = self.parse_execute_parameters()?;
                ExecutableEntity::Procedure {
                    name,
                    return_variable,
                    parameters,
                }
            }
        };

        // WITH RECOMPILE, WITH RESULT SETS (...)
        if self.base.check_word_ci("WITH")
            && (self.base.peek_word_ci(1, "RECOMPILE") || self.base.peek_word_ci(1, "RESULT"))
        {
            self.base.advance();
            loop {
                if self.base.consume_word_ci("RESULT") {
                    self.base.expect_word_ci("SETS")?;
                    if self.base.check_token(&Token::LParen) {
                        self.base.skip_parenthesized()?;
                    } else {
                        self.base.advance();
                    }
                } else {
                    self.base.expect_word_ci("RECOMPILE")?;
                }
                if !self.base.consume_token(&Token::Comma) {
                    break;
                }
            }
        }

        Ok(ExecuteStatement { entity })
    }

    /// `AT linked_server` or `AS USER = '...'` after an EXEC string batch.
    fn skip_execute_context(&mut self) -> Result<(), ParseError> {
        if self.base.consume_word_ci("AT") {
            self.parse_identifier()?;
        }
        if self.base.check_word_ci("AS") && self.base.peek_token(2, &Token::Eq) {
            self.base.advance();
            self.base.advance();
            self.base.advance();
            self.base.advance();
        }
        Ok(())
    }

    /// `[@name =] value [OUTPUT], ...`, stopping at the next statement.
    fn parse_execute_parameters(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut parameters = Vec::new();
        if !self.at_execute_parameter() {
            return Ok(parameters);
        }
        loop {
            if self.check_variable() && self.base.peek_token(1, &Token::Eq) {
                self.base.advance();
                self.base.advance();
            }
            parameters.push(self.parse_expression()?);
            if self.check_any_word_ci(&["OUT", "OUTPUT"]) {
                self.base.advance();
            }
            if !self.base.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(parameters)
    }

    fn at_execute_parameter(&self) -> bool {
        let Some(token) = self.base.current() else {
            return false;
        };
        match token {
            Token::Number(_, _)
            | Token::SingleQuotedString(_)
            | Token::NationalStringLiteral(_)
            | Token::HexStringLiteral(_)
            | Token::Minus
            | Token::Plus => true,
            Token::Word(w) if w.quote_style.is_some() => true,
            Token::Word(w) => {
                let word = w.value.as_str();
                if word.starts_with('@')
                    || word.eq_ignore_ascii_case("NULL")
                    || word.eq_ignore_ascii_case("DEFAULT")
                {
                    return true;
                }
                is_identifier_token(token)
                    && !is_statement_start(word)
                    && !self.base.peek_token(1, &Token::Colon)
            }
            _ => false,
        }
    }
}

fn other(kind: impl Into<String>) -> Statement {
    Statement::Other(OtherStatement { kind: kind.into() })
}

fn unquoted_word_at(parser: &TsqlParser) -> Option<String> {
    parser
        .base
        .current()
        .and_then(unquoted_word)
        .map(str::to_ascii_uppercase)
}

/// Split an `EXEC (...)` argument on `+` into its literal and variable parts.
fn collect_execute_strings(expression: Expression, parts: &mut Vec<ExecuteString>) {
    match expression {
        Expression::Binary {
            left,
            operator: BinaryOperator::Plus,
            right,
        } => {
            collect_execute_strings(*left, parts);
            collect_execute_strings(*right, parts);
        }
        Expression::Parenthesized(inner) => collect_execute_strings(*inner, parts),
        Expression::StringLiteral(s) => parts.push(ExecuteString::Literal(s)),
        Expression::Variable(v) => parts.push(ExecuteString::Variable(v)),
        _ => parts.push(ExecuteString::Other),
    }
}
