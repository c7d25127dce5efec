//! Plain-text lineage report.
//!
//! ```text
//! Parsing Result ::
//!     Tables touched ::
//!         dbo.customers - Read
//!         dbo.orders - Insert
//!
//!     Procedures Invoked ::
//!         dbo.usp_audit
//! ```
//!
//! Indentation is one tab per level. Tables are sorted by name for display only;
//! procedures keep discovery order.

use std::fmt;

use super::model::ParseResult;

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Parsing Result ::")?;

        if !self.table_references.is_empty() {
            writeln!(f, "\tTables touched ::")?;
            let mut tables: Vec<_> = self.table_references.iter().collect();
            tables.sort_by(|a, b| a.table_name.cmp(&b.table_name));
            for table in tables {
                writeln!(f, "\t\t{} - {}", table.table_name, table.operation)?;
            }
        }

        if !self.procedures_invoked.is_empty() {
            writeln!(f)?;
            writeln!(f, "\tProcedures Invoked ::")?;
            for procedure in &self.procedures_invoked {
                writeln!(f, "\t\t{}", procedure)?;
            }
        }

        Ok(())
    }
}
