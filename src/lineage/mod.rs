//! Table and procedure lineage extraction

mod aggregator;
mod extractor;
mod model;
mod report;
mod scope;

pub use aggregator::{normalize_name, ReferenceSet};
pub use extractor::LineageExtractor;
pub use model::{ColumnReference, OperationType, ParseResult, TableReference};
pub use scope::Scope;
