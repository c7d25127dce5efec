//! Deduplicating, order-preserving reference containers.
//!
//! Every table or procedure name passes through [`normalize_name`] before it is
//! stored or compared, and an entry is only added when no entry with the same
//! key exists yet. The first write wins, including its alias.

use std::collections::HashSet;

use serde::Serialize;

use super::model::{OperationType, ParseResult, TableReference};

/// Canonical form of a table or procedure name: trimmed and lowercase.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Ordered set of table references keyed by `(table_name, operation)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReferenceSet {
    entries: Vec<TableReference>,
    /// `(table_name, operation)` of every entry
    #[serde(skip)]
    keys: HashSet<(String, OperationType)>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `(table_name, operation)` unless present. Returns whether it was added.
    pub fn add_if_absent(
        &mut self,
        table_name: &str,
        operation: OperationType,
        alias: Option<&str>,
    ) -> bool {
        let key = (normalize_name(table_name), operation);
        if self.keys.contains(&key) {
            return false;
        }
        self.entries
            .push(TableReference::new(key.0.clone(), operation, alias));
        self.keys.insert(key);
        true
    }

    /// [`add_if_absent`](Self::add_if_absent) for each reference, in order.
    pub fn add_batch<I>(&mut self, references: I)
    where
        I: IntoIterator<Item = TableReference>,
    {
        for reference in references {
            self.add_if_absent(
                &reference.table_name,
                reference.operation,
                reference.alias.as_deref(),
            );
        }
    }

    pub fn contains(&self, table_name: &str, operation: OperationType) -> bool {
        self.keys
            .contains(&(normalize_name(table_name), operation))
    }

    pub fn get(&self, table_name: &str, operation: OperationType) -> Option<&TableReference> {
        if !self.contains(table_name, operation) {
            return None;
        }
        let table_name = normalize_name(table_name);
        self.entries
            .iter()
            .find(|r| r.table_name == table_name && r.operation == operation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TableReference> {
        self.entries.iter()
    }

    /// Overwrite the alias of every entry (a derived table relabels its contents).
    pub(crate) fn relabel(&mut self, alias: &str) {
        for entry in &mut self.entries {
            entry.alias = Some(alias.to_string());
        }
    }

    /// Drop the `(table_name, operation)` entry if it carries `alias`.
    pub(crate) fn remove_aliased(
        &mut self,
        table_name: &str,
        operation: OperationType,
        alias: Option<&str>,
    ) {
        let key = (normalize_name(table_name), operation);
        if !self.keys.contains(&key) {
            return;
        }
        let position = self.entries.iter().position(|r| {
            r.table_name == key.0 && r.operation == operation && r.alias.as_deref() == alias
        });
        if let Some(position) = position {
            self.entries.remove(position);
            self.keys.remove(&key);
        }
    }

    /// Keep only the entries for which `keep` returns true.
    pub(crate) fn retain(&mut self, keep: impl FnMut(&TableReference) -> bool) {
        self.entries.retain(keep);
        self.keys = self
            .entries
            .iter()
            .map(|r| (r.table_name.clone(), r.operation))
            .collect();
    }
}

impl IntoIterator for ReferenceSet {
    type Item = TableReference;
    type IntoIter = std::vec::IntoIter<TableReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a ReferenceSet {
    type Item = &'a TableReference;
    type IntoIter = std::slice::Iter<'a, TableReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl ParseResult {
    /// Record a table reference unless `(table_name, operation)` is already present.
    pub fn add_table_if_absent(
        &mut self,
        table_name: &str,
        operation: OperationType,
        alias: Option<&str>,
    ) -> bool {
        self.table_references
            .add_if_absent(table_name, operation, alias)
    }

    /// Record each reference in order, skipping ones already present.
    pub fn add_tables<I>(&mut self, references: I)
    where
        I: IntoIterator<Item = TableReference>,
    {
        self.table_references.add_batch(references);
    }

    /// Record an invoked procedure unless its normalized name is already present.
    pub fn add_procedure_if_absent(&mut self, name: &str) -> bool {
        let name = normalize_name(name);
        if self.procedures_invoked.contains(&name) {
            return false;
        }
        self.procedures_invoked.push(name);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Dbo.Orders "), "dbo.orders");
    }

    #[test]
    fn test_add_if_absent_first_write_wins() {
        let mut set = ReferenceSet::new();
        assert!(set.add_if_absent("Table1", OperationType::Read, Some("a")));
        assert!(!set.add_if_absent(" table1 ", OperationType::Read, Some("b")));
        assert!(!set.add_if_absent("TABLE1", OperationType::Read, None));
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get("table1", OperationType::Read).unwrap().alias.as_deref(),
            Some("a")
        );
    }

    #[test]
    fn test_operations_are_distinct_keys() {
        let mut set = ReferenceSet::new();
        set.add_if_absent("orders", OperationType::Insert, None);
        set.add_if_absent("orders", OperationType::Update, None);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_add_batch_preserves_order() {
        let mut source = ReferenceSet::new();
        source.add_if_absent("b", OperationType::Read, None);
        source.add_if_absent("a", OperationType::Read, None);

        let mut set = ReferenceSet::new();
        set.add_if_absent("a", OperationType::Read, Some("x"));
        set.add_batch(source);

        let names: Vec<&str> = set.iter().map(|r| r.table_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(set.get("a", OperationType::Read).unwrap().alias.as_deref(), Some("x"));
    }

    #[test]
    fn test_relabel_and_remove_aliased() {
        let mut set = ReferenceSet::new();
        set.add_if_absent("t1", OperationType::Read, Some("x"));
        set.add_if_absent("t2", OperationType::Read, None);
        set.relabel("d");
        assert!(set.iter().all(|r| r.alias.as_deref() == Some("d")));

        set.remove_aliased("t1", OperationType::Read, Some("other"));
        assert_eq!(set.len(), 2);
        set.remove_aliased("T1", OperationType::Read, Some("d"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_removed_entry_can_be_added_again() {
        let mut set = ReferenceSet::new();
        set.add_if_absent("t1", OperationType::Read, Some("a"));
        set.remove_aliased("t1", OperationType::Read, Some("a"));
        assert!(!set.contains("t1", OperationType::Read));
        assert!(set.add_if_absent("t1", OperationType::Read, None));
        assert_eq!(set.len(), 1);

        set.add_if_absent("t2", OperationType::Insert, None);
        set.retain(|r| r.table_name != "t1");
        assert!(!set.contains("t1", OperationType::Read));
        assert!(set.contains("t2", OperationType::Insert));
        assert!(set.add_if_absent("t1", OperationType::Read, Some("b")));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_many_distinct_entries_keep_order() {
        let mut set = ReferenceSet::new();
        for i in 0..20_000 {
            set.add_if_absent(&format!("T{i}"), OperationType::Read, None);
        }
        assert_eq!(set.len(), 20_000);
        assert!(set.contains("t19999", OperationType::Read));
        assert_eq!(set.iter().next().unwrap().table_name, "t0");
        assert_eq!(set.iter().last().unwrap().table_name, "t19999");
    }

    #[test]
    fn test_add_procedure_if_absent() {
        let mut result = ParseResult::new();
        assert!(result.add_procedure_if_absent("dbo.usp_Load"));
        assert!(!result.add_procedure_if_absent("DBO.USP_LOAD "));
        assert_eq!(result.procedures_invoked(), ["dbo.usp_load".to_string()]);
    }
}
