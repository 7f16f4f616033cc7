//! In-memory table model.
//!
//! A [`Table`] is an ordered list of rows over a fixed, ordered set of typed
//! columns. Every row carries exactly one cell per column and every non-null
//! cell matches its column's [`ColumnType`]; both properties are checked
//! whenever rows enter a table through the public constructors.

use crate::{
    data::{ColumnType, Value, display_cell},
    error::{PipelineError, Result},
};

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub datatype: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<Column>, rows: Vec<Row>) -> Result<Self> {
        let mut table = Table::new(columns);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Assembles a table from parts already known to satisfy the layout.
    pub(crate) fn from_parts(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn push_row(&mut self, row: Row) -> Result<()> {
        let index = self.rows.len();
        if row.len() != self.columns.len() {
            return Err(PipelineError::Shape {
                row: index,
                message: format!(
                    "expected {} cell(s) but found {}",
                    self.columns.len(),
                    row.len()
                ),
            });
        }
        for (column, cell) in self.columns.iter().zip(&row) {
            if let Some(value) = cell
                && value.column_type() != column.datatype
            {
                return Err(PipelineError::Shape {
                    row: index,
                    message: format!(
                        "column '{}' is {} but the cell holds {}",
                        column.name,
                        column.datatype,
                        value.column_type()
                    ),
                });
            }
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::column_not_found(name))
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name).map(|idx| self.columns[idx].datatype)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row)?.get(column)?.as_ref()
    }

    pub fn column_values(&self, column: usize) -> impl Iterator<Item = Option<&Value>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).and_then(|cell| cell.as_ref()))
    }

    /// Keeps the rows for which `keep` returns true, preserving order.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&Row) -> bool,
    {
        let rows = self.rows.iter().filter(|row| keep(row)).cloned().collect();
        Table::from_parts(self.columns.clone(), rows)
    }

    /// Projects the named columns, in the requested order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|name| self.require_column(name))
            .collect::<Result<Vec<_>>>()?;
        let columns = indices.iter().map(|idx| self.columns[*idx].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|idx| row[*idx].clone()).collect())
            .collect();
        Ok(Table::from_parts(columns, rows))
    }

    pub fn into_parts(self) -> (Vec<Column>, Vec<Row>) {
        (self.columns, self.rows)
    }

    /// Renders every cell as display text, nulls as empty strings.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| display_cell(cell.as_ref())).collect())
            .collect()
    }
}
