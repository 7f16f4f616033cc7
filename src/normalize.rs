//! Column renaming, dtype coercion, duplicate flagging and float rounding.
//!
//! Every operation consumes its input table and returns a new one, so no
//! stage ever observes a half-transformed table.

use std::collections::HashSet;

use log::{debug, info};

use crate::{
    data::{ColumnType, Value, round_half_even},
    error::{PipelineError, Result},
    frame::{Column, Row, Table},
    mapping::SchemaMapping,
};

pub const DUPLICATE_FLAG: &str = "is_dup";
pub const DEFAULT_ROUND_PLACES: u32 = 2;

/// Duplicate flags for a table: the table with an `is_dup` column appended
/// and the subset of rows that were flagged.
#[derive(Debug, Clone)]
pub struct DuplicateReport {
    pub table: Table,
    pub duplicates: Table,
}

impl DuplicateReport {
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    pub fn unique_count(&self) -> usize {
        self.table.len() - self.duplicates.len()
    }

    pub fn flags(&self) -> Vec<bool> {
        let idx = self.table.width() - 1;
        self.table
            .column_values(idx)
            .map(|cell| matches!(cell, Some(Value::Boolean(true))))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    mapping: SchemaMapping,
}

impl Normalizer {
    pub fn new(mapping: SchemaMapping) -> Self {
        Self { mapping }
    }

    pub fn normalize_names(&self, table: Table) -> Table {
        let (columns, rows) = table.into_parts();
        let columns = columns
            .into_iter()
            .map(|column| {
                let name = self.mapping.canonical_name(&column.name).to_string();
                Column { name, ..column }
            })
            .collect();
        info!("Column names are normalized");
        Table::from_parts(columns, rows)
    }

    pub fn coerce_types(&self, table: Table) -> Result<Table> {
        let (mut columns, mut rows) = table.into_parts();
        for (col_idx, column) in columns.iter_mut().enumerate() {
            let Some(target) = self.mapping.target_type(&column.name) else {
                continue;
            };
            if column.datatype == target {
                continue;
            }
            debug!(
                "Casting column '{}' from {} to {}",
                column.name, column.datatype, target
            );
            for (row_idx, row) in rows.iter_mut().enumerate() {
                if let Some(value) = row[col_idx].take() {
                    let converted = value.convert(target).ok_or_else(|| {
                        PipelineError::TypeCoercion {
                            column: column.name.clone(),
                            row: row_idx,
                            value: value.as_display(),
                            target,
                        }
                    })?;
                    row[col_idx] = Some(converted);
                }
            }
            column.datatype = target;
        }
        info!("The data type of each column is cast");
        Ok(Table::from_parts(columns, rows))
    }

    pub fn detect_duplicates(&self, table: Table) -> DuplicateReport {
        detect_duplicates(table)
    }

    pub fn drop_column(&self, table: Table, name: &str) -> Result<Table> {
        drop_column(table, name)
    }

    pub fn round_floats(&self, table: Table, places: u32) -> Table {
        round_floats(table, places)
    }
}

pub fn detect_duplicates(table: Table) -> DuplicateReport {
    let table = match table.column_index(DUPLICATE_FLAG) {
        Some(idx) => remove_column_at(table, idx),
        None => table,
    };
    let (mut columns, rows) = table.into_parts();
    let mut seen: HashSet<Row> = HashSet::with_capacity(rows.len());
    let mut flagged = Vec::new();
    let mut augmented = Vec::with_capacity(rows.len());
    for mut row in rows {
        let is_dup = !seen.insert(row.clone());
        row.push(Some(Value::Boolean(is_dup)));
        if is_dup {
            flagged.push(row.clone());
        }
        augmented.push(row);
    }
    columns.push(Column::new(DUPLICATE_FLAG, ColumnType::Boolean));
    let duplicates = Table::from_parts(columns.clone(), flagged);
    debug!("Flagged {} duplicate row(s)", duplicates.len());
    DuplicateReport {
        table: Table::from_parts(columns, augmented),
        duplicates,
    }
}

pub fn drop_column(table: Table, name: &str) -> Result<Table> {
    let idx = table.require_column(name)?;
    Ok(remove_column_at(table, idx))
}

fn remove_column_at(table: Table, idx: usize) -> Table {
    let (mut columns, mut rows) = table.into_parts();
    columns.remove(idx);
    for row in &mut rows {
        row.remove(idx);
    }
    Table::from_parts(columns, rows)
}

/// Keeps the first occurrence of every distinct row, preserving order.
pub fn drop_duplicate_rows(table: Table) -> Table {
    let (columns, rows) = table.into_parts();
    let mut seen: HashSet<Row> = HashSet::with_capacity(rows.len());
    let rows = rows
        .into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect();
    Table::from_parts(columns, rows)
}

/// Rounds every Float column half-to-even at `places` decimals. NaN and
/// infinities are left as they are.
pub fn round_floats(table: Table, places: u32) -> Table {
    let float_columns = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| column.datatype == ColumnType::Float)
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();
    let (columns, mut rows) = table.into_parts();
    for row in &mut rows {
        for idx in &float_columns {
            if let Some(Value::Float(value)) = row[*idx].as_mut() {
                *value = round_half_even(*value, places);
            }
        }
    }
    Table::from_parts(columns, rows)
}
