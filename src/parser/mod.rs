//! T-SQL parsing

mod batch;
mod expression_parser;
mod identifier_utils;
mod query_parser;
mod statement_parser;
mod token_parser_base;
mod tsql_parser;
mod version;

pub use batch::{split_batches, Batch};
pub use tsql_parser::parse_script;
pub use version::SqlVersion;
