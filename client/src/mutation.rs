use crate::row::Row;
use crate::table::Table;
use crate::value::Value;

/// An insert of one row, created through [`Table::new_insert`].
///
/// The key columns must be set before the mutation is applied to a
/// session.
#[derive(Debug, Clone)]
pub struct Insert {
    table: Table,
    row: Row,
}

impl Insert {
    pub(crate) fn new(table: Table) -> Insert {
        let row = Row::new(table.schema().clone());
        Insert { table, row }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn row_mut(&mut self) -> &mut Row {
        &mut self.row
    }

    /// Shorthand for `row_mut().set(..)`.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> strata_rpc::Result<()> {
        self.row.set(column, value)
    }
}
