//! Lineage extraction over the parsed syntax tree.
//!
//! The extractor walks every batch depth-first. Container statements (procedures,
//! blocks, TRY/CATCH, WHILE, IF) recurse with the same dispatch; every other
//! statement is extracted with a fresh [`Scope`] holding its CTE bindings and
//! aliases, and its tables are merged into the shared [`ParseResult`].
//!
//! Table sources are visited without recursing along join chains: a left-deep
//! chain is walked with a cursor over the `first` side, collecting the `second`
//! side at each step, so `a JOIN b JOIN c` yields `c`, `b`, `a`.

use tracing::{debug, trace};

use super::aggregator::{normalize_name, ReferenceSet};
use super::model::{OperationType, ParseResult, TableReference};
use super::scope::Scope;
use crate::ast::{
    DeclareVariableStatement, DeleteStatement, DmlTarget, ExecutableEntity, ExecuteStatement,
    ExecuteString, Expression, IfStatement, InsertSource, InsertStatement, MergeStatement,
    QueryExpression, QuerySpecification, SchemaObjectName, Script, SelectElement,
    SelectStatement, Statement, TableFactor, UnaryOperator, UpdateStatement, WithClause,
};

/// Stateless lineage visitor; all state lives in the result and per-statement scopes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineageExtractor;

impl LineageExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the lineage of every batch of `script` into one result.
    pub fn extract(&self, script: &Script) -> ParseResult {
        let mut result = ParseResult::new();
        for batch in &script.batches {
            self.extract_statements(&batch.statements, &mut result);
        }
        debug!(
            tables = result.table_references().len(),
            procedures = result.procedures_invoked().len(),
            dynamic_sql = result.has_dynamic_sql(),
            "extracted lineage"
        );
        result
    }

    fn extract_statements(&self, statements: &[Statement], result: &mut ParseResult) {
        for statement in statements {
            self.extract_statement(statement, result);
        }
    }

    fn extract_statement(&self, statement: &Statement, result: &mut ParseResult) {
        match statement {
            Statement::CreateProcedure(procedure) => {
                match object_name(&procedure.name) {
                    Some(name) => result.set_procedure_name_if_absent(name),
                    None => debug!(name = %procedure.name, "unsupported procedure name shape"),
                }
                self.extract_statements(&procedure.statements, result);
            }
            Statement::BeginEndBlock(block) => self.extract_statements(&block.statements, result),
            Statement::TryCatch(try_catch) => {
                self.extract_statements(&try_catch.try_statements, result);
                self.extract_statements(&try_catch.catch_statements, result);
            }
            Statement::While(while_statement) => self.extract_statement(&while_statement.body, result),
            Statement::If(if_statement) => self.extract_if(if_statement, result),
            Statement::DeclareVariable(declare) => self.extract_declare(declare, result),
            Statement::Select(select) => self.extract_select(select, result),
            Statement::Insert(insert) => self.extract_insert(insert, result),
            Statement::Update(update) => self.extract_update(update, result),
            Statement::Delete(delete) => self.extract_delete(delete, result),
            Statement::Merge(merge) => self.extract_merge(merge, result),
            Statement::Execute(execute) => self.extract_execute(execute, result),
            Statement::SetVariable(set) => {
                trace!(variable = %set.variable, "variable assignment skipped");
            }
            Statement::Other(other) => {
                debug!(kind = %other.kind, "statement not modeled for lineage");
            }
        }
    }

    // ========================================================================
    // Control flow and variables
    // ========================================================================

    fn extract_if(&self, statement: &IfStatement, result: &mut ParseResult) {
        if let Some(query) = exists_subquery(&statement.predicate) {
            let mut scope = Scope::new();
            let tables = self.query_tables(query, &mut scope);
            result.add_tables(tables);
        }
        self.extract_statement(&statement.then_statement, result);
        if let Some(else_statement) = &statement.else_statement {
            self.extract_statement(else_statement, result);
        }
    }

    fn extract_declare(&self, statement: &DeclareVariableStatement, result: &mut ParseResult) {
        for declaration in &statement.declarations {
            let Some(initializer) = &declaration.initializer else {
                continue;
            };
            match scalar_subquery(initializer) {
                Some(query) => {
                    let mut scope = Scope::new();
                    let tables = self.query_tables(query, &mut scope);
                    result.add_tables(tables);
                }
                None => trace!(variable = %declaration.name, "initializer reads no tables"),
            }
        }
    }

    // ========================================================================
    // Queries and data modification
    // ========================================================================

    fn extract_select(&self, statement: &SelectStatement, result: &mut ParseResult) {
        let mut scope = Scope::new();
        self.resolve_ctes(statement.with.as_ref(), &mut scope);
        let tables = self.query_tables(&statement.query, &mut scope);
        result.add_tables(scope.substitute_ctes(tables));
    }

    fn extract_insert(&self, statement: &InsertStatement, result: &mut ParseResult) {
        let mut scope = Scope::new();
        self.resolve_ctes(statement.with.as_ref(), &mut scope);
        add_write_target(&statement.target, OperationType::Insert, None, &scope, result);

        match &statement.source {
            InsertSource::Query(query) => {
                let tables = self.query_tables(query, &mut scope);
                result.add_tables(scope.substitute_ctes(tables));
            }
            InsertSource::Execute(execute) => self.extract_execute(execute, result),
            InsertSource::Values(_) | InsertSource::DefaultValues => {
                trace!("INSERT source reads no tables");
            }
        }
    }

    fn extract_update(&self, statement: &UpdateStatement, result: &mut ParseResult) {
        let mut scope = Scope::new();
        self.extract_modification(
            statement.with.as_ref(),
            &statement.target,
            &statement.from,
            OperationType::Update,
            &mut scope,
            result,
        );

        for clause in &statement.set_clauses {
            for query in nested_queries(&clause.expression) {
                let tables = self.query_tables(query, &mut scope);
                result.add_tables(scope.substitute_ctes(tables));
            }
        }
    }

    fn extract_delete(&self, statement: &DeleteStatement, result: &mut ParseResult) {
        let mut scope = Scope::new();
        self.extract_modification(
            statement.with.as_ref(),
            &statement.target,
            &statement.from,
            OperationType::Delete,
            &mut scope,
            result,
        );
    }

    /// Shared UPDATE/DELETE rule: the target may be an alias from the FROM clause,
    /// in which case the table behind the alias receives `operation`.
    fn extract_modification(
        &self,
        with: Option<&WithClause>,
        target: &DmlTarget,
        from: &[TableFactor],
        operation: OperationType,
        scope: &mut Scope,
        result: &mut ParseResult,
    ) {
        self.resolve_ctes(with, scope);

        let mut reads = ReferenceSet::new();
        for factor in from {
            self.table_source_tables(factor, scope, &mut reads);
        }

        let target_alias = if from.is_empty() {
            None
        } else {
            target.single_identifier()
        };
        let backing = target_alias
            .and_then(|alias| scope.resolve_alias(alias))
            .cloned();
        let derived = target_alias
            .and_then(|alias| scope.resolve_derived(alias))
            .cloned();

        match (backing, derived) {
            (Some(backing), _) => {
                trace!(
                    table = %backing.table_name,
                    alias = ?backing.alias,
                    %operation,
                    "target resolved through FROM alias"
                );
                reads.remove_aliased(
                    &backing.table_name,
                    OperationType::Read,
                    backing.alias.as_deref(),
                );
                add_written_table(
                    &backing.table_name,
                    operation,
                    backing.alias.as_deref(),
                    scope,
                    result,
                );
            }
            // Writing through a derived table writes the tables it reads
            (None, Some(bases)) => {
                trace!(alias = ?target_alias, %operation, "target resolved through derived table");
                for base in &bases {
                    reads.remove_aliased(
                        &base.table_name,
                        OperationType::Read,
                        base.alias.as_deref(),
                    );
                    add_written_table(
                        &base.table_name,
                        operation,
                        base.alias.as_deref(),
                        scope,
                        result,
                    );
                }
            }
            (None, None) => add_write_target(target, operation, None, scope, result),
        }

        result.add_tables(scope.substitute_ctes(reads));
    }

    /// The MERGE target is reported as both inserted and updated.
    fn extract_merge(&self, statement: &MergeStatement, result: &mut ParseResult) {
        let mut scope = Scope::new();
        self.resolve_ctes(statement.with.as_ref(), &mut scope);

        let alias = statement.target_alias.as_deref();
        add_write_target(&statement.target, OperationType::Insert, alias, &scope, result);
        add_write_target(&statement.target, OperationType::Update, alias, &scope, result);

        let mut reads = ReferenceSet::new();
        self.table_source_tables(&statement.source, &mut scope, &mut reads);
        result.add_tables(scope.substitute_ctes(reads));
    }

    fn extract_execute(&self, statement: &ExecuteStatement, result: &mut ParseResult) {
        match &statement.entity {
            ExecutableEntity::Procedure { name, .. } => match object_name(name) {
                Some(procedure) => {
                    result.add_procedure_if_absent(&procedure);
                }
                None => debug!(procedure = %name, "unsupported procedure name shape"),
            },
            ExecutableEntity::ProcedureVariable(variable) => {
                debug!(%variable, "procedure named through a variable");
            }
            ExecutableEntity::Strings(parts) => {
                result.mark_dynamic_sql();
                for part in parts {
                    match part {
                        ExecuteString::Literal(text) => {
                            result.push_dynamic_sql_fragment(text.clone())
                        }
                        ExecuteString::Variable(variable) => {
                            trace!(%variable, "dynamic SQL text held in a variable");
                        }
                        ExecuteString::Other => trace!("dynamic SQL part is not a literal"),
                    }
                }
            }
        }
    }

    // ========================================================================
    // Scope resolution
    // ========================================================================

    /// Bind each CTE of `with`, in declaration order, to its flattened base tables.
    fn resolve_ctes(&self, with: Option<&WithClause>, scope: &mut Scope) {
        let Some(with) = with else {
            return;
        };
        for cte in &with.ctes {
            let tables = self.query_tables(&cte.query, scope);
            let flattened = scope.substitute_ctes(tables);
            trace!(cte = %cte.name, tables = flattened.len(), "bound common table expression");
            scope.bind_cte(&cte.name, flattened);
        }
        // Aliases inside CTE bodies are not visible to the statement
        scope.forget_aliases();
    }

    // ========================================================================
    // Queries and table sources
    // ========================================================================

    /// Read tables of a query; set operations contribute both sides, left first.
    fn query_tables(&self, query: &QueryExpression, scope: &mut Scope) -> ReferenceSet {
        let mut tables = ReferenceSet::new();
        let mut pending = vec![query];
        while let Some(query) = pending.pop() {
            match query {
                QueryExpression::Specification(specification) => {
                    self.specification_tables(specification, scope, &mut tables)
                }
                QueryExpression::Binary { left, right, .. } => {
                    pending.push(right.as_ref());
                    pending.push(left.as_ref());
                }
                QueryExpression::Parenthesized(inner) => pending.push(inner.as_ref()),
            }
        }
        tables
    }

    fn specification_tables(
        &self,
        specification: &QuerySpecification,
        scope: &mut Scope,
        tables: &mut ReferenceSet,
    ) {
        for factor in &specification.from {
            self.table_source_tables(factor, scope, tables);
        }

        for element in &specification.select_elements {
            let expression = match element {
                SelectElement::Expression { expression, .. }
                | SelectElement::SetVariable { expression, .. } => expression,
                SelectElement::Wildcard { .. } => continue,
            };
            for query in nested_queries(expression) {
                let nested = self.query_tables(query, scope);
                tables.add_batch(nested);
            }
        }

        if let Some(into) = &specification.into {
            debug!(table = %into, "SELECT INTO target not recorded");
        }
    }

    /// Walk a FROM-clause entry, iterating along the `first` side of joins.
    fn table_source_tables(
        &self,
        factor: &TableFactor,
        scope: &mut Scope,
        tables: &mut ReferenceSet,
    ) {
        let mut cursor = factor;
        while let TableFactor::Join(join) = cursor {
            self.leaf_tables(&join.second, scope, tables);
            cursor = &join.first;
        }
        self.leaf_tables(cursor, scope, tables);
    }

    fn leaf_tables(&self, factor: &TableFactor, scope: &mut Scope, tables: &mut ReferenceSet) {
        match factor {
            TableFactor::Named { name, alias } => match object_name(name) {
                Some(table_name) => {
                    let reference =
                        TableReference::new(table_name, OperationType::Read, alias.as_deref());
                    if let Some(alias) = alias {
                        scope.record_alias(alias, reference.clone());
                    }
                    tables.add_batch([reference]);
                }
                None => debug!(table = %name, "unsupported table name shape"),
            },
            TableFactor::Variable { name, alias } => {
                tables.add_if_absent(name, OperationType::Read, alias.as_deref());
            }
            TableFactor::Derived { query, alias } => {
                let mut inner = self.query_tables(query, scope);
                if let Some(alias) = alias {
                    inner.relabel(alias);
                    scope.record_derived(alias, inner.clone());
                }
                tables.add_batch(inner);
            }
            // Parenthesized join on the right-hand side of another join
            TableFactor::Join(_) => self.table_source_tables(factor, scope, tables),
            TableFactor::Function { name, .. } => {
                debug!(function = %name, "table-valued function source skipped");
            }
            TableFactor::Values { .. } => trace!("inline VALUES source skipped"),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// `name` or `schema.name`, normalized. Other shapes cannot be keyed reliably.
fn object_name(name: &SchemaObjectName) -> Option<String> {
    match name.identifiers.as_slice() {
        [object] => Some(normalize_name(object)),
        [schema, object] => Some(format!(
            "{}.{}",
            normalize_name(schema),
            normalize_name(object)
        )),
        _ => None,
    }
}

fn add_write_target(
    target: &DmlTarget,
    operation: OperationType,
    alias: Option<&str>,
    scope: &Scope,
    result: &mut ParseResult,
) {
    match target {
        DmlTarget::Table(name) => match object_name(name) {
            Some(table_name) => add_written_table(&table_name, operation, alias, scope, result),
            None => debug!(table = %name, %operation, "unsupported target name shape"),
        },
        DmlTarget::Variable(name) => {
            result.add_table_if_absent(name, operation, alias);
        }
    }
}

/// Record a write; writing through a CTE writes its base tables.
fn add_written_table(
    table_name: &str,
    operation: OperationType,
    alias: Option<&str>,
    scope: &Scope,
    result: &mut ParseResult,
) {
    match scope.resolve_if_cte(table_name) {
        Some(bases) => {
            for base in bases {
                result.add_table_if_absent(&base.table_name, operation, alias);
            }
        }
        None => {
            result.add_table_if_absent(table_name, operation, alias);
        }
    }
}

/// The subquery of `EXISTS (...)`, looking through parentheses and NOT.
fn exists_subquery(predicate: &Expression) -> Option<&QueryExpression> {
    let mut current = predicate;
    loop {
        match current {
            Expression::Exists(query) => return Some(query.as_ref()),
            Expression::Parenthesized(inner)
            | Expression::Unary {
                operator: UnaryOperator::Not,
                expression: inner,
            } => current = inner.as_ref(),
            _ => return None,
        }
    }
}

/// The query of a `(SELECT ...)` initializer.
fn scalar_subquery(expression: &Expression) -> Option<&QueryExpression> {
    let mut current = expression;
    loop {
        match current {
            Expression::ScalarSubquery(query) => return Some(query.as_ref()),
            Expression::Parenthesized(inner) => current = inner.as_ref(),
            _ => return None,
        }
    }
}

/// Queries nested anywhere inside `expression`, in source order.
fn nested_queries(expression: &Expression) -> Vec<&QueryExpression> {
    let mut queries = Vec::new();
    let mut pending = vec![expression];
    while let Some(expression) = pending.pop() {
        match expression {
            Expression::ScalarSubquery(query) | Expression::Exists(query) => {
                queries.push(query.as_ref())
            }
            Expression::InSubquery {
                expression,
                subquery,
                ..
            } => {
                pending.push(expression.as_ref());
                queries.push(subquery.as_ref());
            }
            Expression::Function { arguments, .. } => pending.extend(arguments.iter().rev()),
            Expression::Case {
                operand,
                when_clauses,
                else_result,
            } => {
                if let Some(else_result) = else_result {
                    pending.push(else_result.as_ref());
                }
                for clause in when_clauses.iter().rev() {
                    pending.push(&clause.result);
                    pending.push(&clause.condition);
                }
                if let Some(operand) = operand {
                    pending.push(operand.as_ref());
                }
            }
            Expression::InList {
                expression, list, ..
            } => {
                pending.extend(list.iter().rev());
                pending.push(expression.as_ref());
            }
            Expression::Between {
                expression,
                low,
                high,
                ..
            } => {
                pending.push(high.as_ref());
                pending.push(low.as_ref());
                pending.push(expression.as_ref());
            }
            Expression::Binary { left, right, .. } => {
                pending.push(right.as_ref());
                pending.push(left.as_ref());
            }
            Expression::Cast { expression, .. }
            | Expression::IsNull { expression, .. }
            | Expression::Unary { expression, .. }
            | Expression::Parenthesized(expression) => pending.push(expression.as_ref()),
            Expression::StringLiteral(_)
            | Expression::NumberLiteral(_)
            | Expression::Null
            | Expression::Variable(_)
            | Expression::Column(_)
            | Expression::Star
            | Expression::Other(_) => {}
        }
    }
    queries
}
