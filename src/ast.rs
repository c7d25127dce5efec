//! Syntax tree produced by the T-SQL parser and consumed by the lineage extractor.
//!
//! The tree only models the constructs lineage extraction looks at. Everything
//! else the parser accepts is kept as [`Statement::Other`], [`TableFactor::Function`]
//! or [`Expression::Other`] so that callers can see what was skipped.

/// A parsed script: the `GO`-separated batches in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub batches: Vec<Batch>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateProcedure(CreateProcedureStatement),
    BeginEndBlock(BeginEndBlockStatement),
    TryCatch(TryCatchStatement),
    While(WhileStatement),
    If(IfStatement),
    DeclareVariable(DeclareVariableStatement),
    SetVariable(SetVariableStatement),
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Merge(Box<MergeStatement>),
    Execute(ExecuteStatement),
    /// A statement the parser consumed without modeling it (DDL, SET options, PRINT, ...)
    Other(OtherStatement),
}

impl Statement {
    /// Short name of the statement kind, used in diagnostics.
    pub fn kind(&self) -> &str {
        match self {
            Statement::CreateProcedure(_) => "CREATE PROCEDURE",
            Statement::BeginEndBlock(_) => "BEGIN...END",
            Statement::TryCatch(_) => "TRY...CATCH",
            Statement::While(_) => "WHILE",
            Statement::If(_) => "IF",
            Statement::DeclareVariable(_) => "DECLARE",
            Statement::SetVariable(_) => "SET",
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::Merge(_) => "MERGE",
            Statement::Execute(_) => "EXECUTE",
            Statement::Other(other) => &other.kind,
        }
    }
}

// =============================================================================
// Names
// =============================================================================

/// A dotted object name such as `[dbo].[Orders]`, unquoted identifier values in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaObjectName {
    pub identifiers: Vec<String>,
}

impl SchemaObjectName {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }

    /// The last identifier (the object itself), if any.
    pub fn base_identifier(&self) -> Option<&str> {
        self.identifiers.last().map(String::as_str)
    }
}

impl std::fmt::Display for SchemaObjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifiers.join("."))
    }
}

// =============================================================================
// Control flow and containers
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CreateProcedureStatement {
    pub name: SchemaObjectName,
    /// `ALTER PROCEDURE` or `CREATE OR ALTER PROCEDURE`
    pub is_alter: bool,
    pub parameters: Vec<ProcedureParameter>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureParameter {
    pub name: String,
    pub data_type: String,
    pub default_value: Option<Expression>,
    pub is_output: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeginEndBlockStatement {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TryCatchStatement {
    pub try_statements: Vec<Statement>,
    pub catch_statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub predicate: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub predicate: Expression,
    pub then_statement: Box<Statement>,
    pub else_statement: Option<Box<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareVariableStatement {
    pub declarations: Vec<DeclareVariableElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclareVariableElement {
    pub name: String,
    /// Type text as written, e.g. `INT`, `VARCHAR(10)` or `TABLE`
    pub data_type: String,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetVariableStatement {
    pub variable: String,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtherStatement {
    /// Leading keywords of the statement, uppercased (e.g. `CREATE TABLE`, `PRINT`)
    pub kind: String,
}

// =============================================================================
// Data modification
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WithClause {
    pub ctes: Vec<CommonTableExpression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpression {
    pub name: String,
    pub columns: Vec<String>,
    pub query: QueryExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub with: Option<WithClause>,
    pub query: QueryExpression,
}

/// Target of INSERT/UPDATE/DELETE/MERGE.
#[derive(Debug, Clone, PartialEq)]
pub enum DmlTarget {
    Table(SchemaObjectName),
    /// A table variable such as `@orders`
    Variable(String),
}

impl DmlTarget {
    /// The target written as a single bare identifier, if it is one.
    ///
    /// UPDATE and DELETE targets of this shape may be aliases defined in the FROM clause.
    pub fn single_identifier(&self) -> Option<&str> {
        match self {
            DmlTarget::Table(name) if name.identifiers.len() == 1 => name.base_identifier(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub with: Option<WithClause>,
    pub target: DmlTarget,
    pub columns: Vec<String>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Query(QueryExpression),
    Values(Vec<Vec<Expression>>),
    Execute(ExecuteStatement),
    DefaultValues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    pub column: Vec<String>,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub with: Option<WithClause>,
    pub target: DmlTarget,
    pub set_clauses: Vec<SetClause>,
    pub from: Vec<TableFactor>,
    pub selection: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub with: Option<WithClause>,
    pub target: DmlTarget,
    pub from: Vec<TableFactor>,
    pub selection: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeStatement {
    pub with: Option<WithClause>,
    pub target: DmlTarget,
    pub target_alias: Option<String>,
    pub source: TableFactor,
    pub on: Expression,
    pub clauses: Vec<MergeClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeClause {
    pub kind: MergeClauseKind,
    pub predicate: Option<Expression>,
    pub action: MergeAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeClauseKind {
    Matched,
    NotMatchedByTarget,
    NotMatchedBySource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeAction {
    Update(Vec<SetClause>),
    Delete,
    Insert {
        columns: Vec<String>,
        values: Option<Vec<Expression>>,
    },
}

// =============================================================================
// EXECUTE
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteStatement {
    pub entity: ExecutableEntity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutableEntity {
    /// `EXEC dbo.proc @a = 1`
    Procedure {
        name: SchemaObjectName,
        return_variable: Option<String>,
        parameters: Vec<Expression>,
    },
    /// `EXEC @procedure_name`
    ProcedureVariable(String),
    /// `EXEC ('SELECT ...' + @sql)`
    Strings(Vec<ExecuteString>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteString {
    Literal(String),
    Variable(String),
    Other,
}

// =============================================================================
// Queries
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpression {
    Specification(Box<QuerySpecification>),
    Binary {
        operator: SetOperator,
        all: bool,
        left: Box<QueryExpression>,
        right: Box<QueryExpression>,
    },
    Parenthesized(Box<QueryExpression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Except,
    Intersect,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpecification {
    pub distinct: bool,
    pub top: Option<Expression>,
    pub select_elements: Vec<SelectElement>,
    /// `SELECT ... INTO #target`
    pub into: Option<SchemaObjectName>,
    pub from: Vec<TableFactor>,
    pub selection: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectElement {
    /// `*` or `t.*`
    Wildcard { qualifier: Vec<String> },
    Expression {
        expression: Expression,
        alias: Option<String>,
    },
    /// `@v = expr`
    SetVariable {
        variable: String,
        expression: Expression,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    Named {
        name: SchemaObjectName,
        alias: Option<String>,
    },
    Variable {
        name: String,
        alias: Option<String>,
    },
    Derived {
        query: Box<QueryExpression>,
        alias: Option<String>,
    },
    /// A binary join node; chains are left-deep (`first` holds the earlier joins).
    Join(Box<JoinTableReference>),
    /// Table-valued function or rowset function (`dbo.fn(@x)`, `OPENJSON(@doc)`)
    Function {
        name: SchemaObjectName,
        arguments: Vec<Expression>,
        alias: Option<String>,
    },
    /// Inline `(VALUES (...), (...)) AS v (a, b)`
    Values { alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinTableReference {
    pub kind: JoinKind,
    pub first: TableFactor,
    pub second: TableFactor,
    pub condition: Option<Expression>,
}

/// Join chains nest one level per join, so they are unlinked iteratively.
impl Drop for JoinTableReference {
    fn drop(&mut self) {
        let mut pending = std::mem::replace(&mut self.first, TableFactor::Values { alias: None });
        while let TableFactor::Join(mut join) = pending {
            pending = std::mem::replace(&mut join.first, TableFactor::Values { alias: None });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
    CrossApply,
    OuterApply,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    StringLiteral(String),
    NumberLiteral(String),
    Null,
    Variable(String),
    Column(Vec<String>),
    /// `*` inside `COUNT(*)`
    Star,
    Function {
        name: Vec<String>,
        arguments: Vec<Expression>,
    },
    Case {
        operand: Option<Box<Expression>>,
        when_clauses: Vec<WhenClause>,
        else_result: Option<Box<Expression>>,
    },
    Cast {
        expression: Box<Expression>,
        data_type: String,
    },
    ScalarSubquery(Box<QueryExpression>),
    Exists(Box<QueryExpression>),
    InList {
        expression: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    InSubquery {
        expression: Box<Expression>,
        subquery: Box<QueryExpression>,
        negated: bool,
    },
    Between {
        expression: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
    IsNull {
        expression: Box<Expression>,
        negated: bool,
    },
    Binary {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        expression: Box<Expression>,
    },
    Parenthesized(Box<Expression>),
    /// A keyword expression the tree does not model (e.g. `CURRENT_TIMESTAMP`)
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    pub condition: Expression,
    pub result: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
    BitwiseNot,
}
