use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::column::MySqlColumn;
use crate::value::MySqlValue;

/// A single row from a result set.
///
/// Values are addressable by position or by column name. When a result
/// set carries duplicate column names, the name resolves to the first.
#[derive(Debug, Clone)]
pub struct MySqlRow {
    pub(crate) columns: Arc<[MySqlColumn]>,
    pub(crate) values: Vec<MySqlValue>,
}

impl MySqlRow {
    /// Returns the number of columns in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the columns of the result set this row belongs to.
    pub fn columns(&self) -> &[MySqlColumn] {
        &self.columns
    }

    /// Returns the position of the named column, if present. The first
    /// match wins.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name() == name)
    }

    /// Returns the value of the named column.
    pub fn get(&self, name: &str) -> Option<&MySqlValue> {
        self.column_index(name).map(|index| &self.values[index])
    }

    /// Returns the value at the position.
    pub fn get_index(&self, index: usize) -> Option<&MySqlValue> {
        self.values.get(index)
    }

    /// Like [`get`](Self::get), but a missing column is an error.
    pub fn try_get(&self, name: &str) -> Result<&MySqlValue> {
        self.get(name)
            .ok_or_else(|| Error::Decoding(format!("no column named `{name}` in the row")))
    }

    /// Consumes the row, returning its values in column order.
    pub fn into_values(self) -> Vec<MySqlValue> {
        self.values
    }
}
