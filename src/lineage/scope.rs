//! Statement-local name resolution: common table expressions and table aliases.

use std::collections::HashMap;

use super::aggregator::{normalize_name, ReferenceSet};
use super::model::TableReference;

/// CTE bindings and alias map of the statement being extracted.
///
/// A scope lives for one statement; nested queries of that statement share it.
#[derive(Debug, Default)]
pub struct Scope {
    /// CTE name -> base tables the CTE reads, already flattened
    ctes: HashMap<String, ReferenceSet>,
    /// alias -> table introduced under that alias in a FROM clause
    aliases: HashMap<String, TableReference>,
    /// alias -> tables read by a derived table introduced under that alias
    derived: HashMap<String, ReferenceSet>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to its flattened tables. A reference to the CTE itself is dropped.
    pub fn bind_cte(&mut self, name: &str, mut resolved: ReferenceSet) {
        let name = normalize_name(name);
        resolved.retain(|r| r.table_name != name);
        self.ctes.insert(name, resolved);
    }

    pub fn resolve_if_cte(&self, name: &str) -> Option<&ReferenceSet> {
        self.ctes.get(&normalize_name(name))
    }

    pub fn is_cte(&self, name: &str) -> bool {
        self.ctes.contains_key(&normalize_name(name))
    }

    /// Remember that `alias` names `table` in this statement.
    pub fn record_alias(&mut self, alias: &str, table: TableReference) {
        self.aliases.insert(normalize_name(alias), table);
    }

    pub fn resolve_alias(&self, candidate: &str) -> Option<&TableReference> {
        self.aliases.get(&normalize_name(candidate))
    }

    /// Remember that `alias` names a derived table reading `tables`.
    pub fn record_derived(&mut self, alias: &str, tables: ReferenceSet) {
        self.derived.insert(normalize_name(alias), tables);
    }

    pub fn resolve_derived(&self, candidate: &str) -> Option<&ReferenceSet> {
        self.derived.get(&normalize_name(candidate))
    }

    /// Drop recorded aliases, keeping CTE bindings.
    pub(crate) fn forget_aliases(&mut self) {
        self.aliases.clear();
        self.derived.clear();
    }

    /// Replace every CTE name in `set` with the tables bound to it.
    pub fn substitute_ctes(&self, set: ReferenceSet) -> ReferenceSet {
        let mut substituted = ReferenceSet::new();
        for reference in set {
            match self.resolve_if_cte(&reference.table_name) {
                Some(resolved) => substituted.add_batch(resolved.iter().cloned()),
                None => substituted.add_batch([reference]),
            }
        }
        substituted
    }
}
