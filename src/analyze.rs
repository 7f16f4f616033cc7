//! Grouped statistics, anomaly filters and the debt-to-income ratio.
//!
//! Nothing here mutates its input; every function borrows a normalized
//! table and returns a freshly owned result.

use std::{collections::BTreeMap, fmt};

use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{
    data::{ColumnType, Value},
    error::Result,
    frame::{Column, Table},
    mapping::{
        BUSINESS_ID, BUSINESS_STATE, DEBT_TO_EQUITY, DEBT_TO_INCOME_RATIO, TOTAL_LONG_TERM_DEBT,
        TOTAL_REVENUE,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Mean,
    Median,
    Min,
    Max,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::Mean,
        Statistic::Median,
        Statistic::Min,
        Statistic::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Min => "min",
            Statistic::Max => "max",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mean, median, min and max of the non-null, non-NaN values of one column
/// within one group. All four are NaN when the group had no such values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Summary {
                count: 0,
                mean: f64::NAN,
                median: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        let sorted = values.iter().copied().sorted_by(f64::total_cmp).collect_vec();
        let mid = sorted.len() / 2;
        let median = if sorted.len().is_multiple_of(2) {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        Summary {
            count: sorted.len(),
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            median,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        }
    }

    pub fn get(&self, statistic: Statistic) -> f64 {
        match statistic {
            Statistic::Mean => self.mean,
            Statistic::Median => self.median,
            Statistic::Min => self.min,
            Statistic::Max => self.max,
        }
    }
}

/// Per-state statistics keyed by `(business_state, column, statistic)`.
/// States iterate in lexicographic order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsTable {
    columns: Vec<String>,
    groups: BTreeMap<String, Vec<Summary>>,
}

impl StatsTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn summary(&self, state: &str, column: &str) -> Option<&Summary> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.groups.get(state)?.get(idx)
    }

    pub fn get(&self, state: &str, column: &str, statistic: Statistic) -> Option<f64> {
        self.summary(state, column).map(|s| s.get(statistic))
    }

    /// Flattens to one row per `(state, column)` pair.
    pub fn to_table(&self) -> Table {
        let mut columns = vec![
            Column::new(BUSINESS_STATE, ColumnType::String),
            Column::new("column", ColumnType::String),
            Column::new("count", ColumnType::Integer),
        ];
        columns.extend(
            Statistic::ALL
                .iter()
                .map(|stat| Column::new(stat.as_str(), ColumnType::Float)),
        );
        let mut rows = Vec::new();
        for (state, summaries) in &self.groups {
            for (column, summary) in self.columns.iter().zip(summaries) {
                let mut row = vec![
                    Some(Value::String(state.clone())),
                    Some(Value::String(column.clone())),
                    Some(Value::Integer(summary.count as i64)),
                ];
                row.extend(
                    Statistic::ALL
                        .iter()
                        .map(|stat| Some(Value::Float(summary.get(*stat)))),
                );
                rows.push(row);
            }
        }
        Table::from_parts(columns, rows)
    }
}

/// Rows whose `debt_to_equity` is strictly negative, in input order.
pub fn filter_negative_debt_to_equity(table: &Table) -> Result<Table> {
    let idx = table.require_column(DEBT_TO_EQUITY)?;
    let filtered = table.filter_rows(|row| {
        row[idx]
            .as_ref()
            .and_then(Value::as_f64)
            .is_some_and(|value| value < 0.0)
    });
    info!(
        "{} business(es) with negative debt-to-equity",
        filtered.len()
    );
    Ok(filtered)
}

/// Groups by `business_state` and summarizes every numeric column except
/// `business_id`. Rows with a null state are not grouped.
pub fn compute_group_stats(table: &Table) -> Result<StatsTable> {
    let state_idx = table.require_column(BUSINESS_STATE)?;
    let numeric = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| column.datatype.is_numeric() && column.name != BUSINESS_ID)
        .map(|(idx, column)| (idx, column.name.clone()))
        .collect_vec();

    let mut values: BTreeMap<String, Vec<Vec<f64>>> = BTreeMap::new();
    for row in table.rows() {
        let Some(state) = row[state_idx].as_ref().map(Value::as_display) else {
            continue;
        };
        let buckets = values
            .entry(state)
            .or_insert_with(|| vec![Vec::new(); numeric.len()]);
        for (bucket, (idx, _)) in buckets.iter_mut().zip(&numeric) {
            if let Some(value) = row[*idx].as_ref().and_then(Value::as_f64)
                && !value.is_nan()
            {
                bucket.push(value);
            }
        }
    }

    let groups = values
        .into_iter()
        .map(|(state, buckets)| {
            let summaries = buckets.iter().map(|b| Summary::from_values(b)).collect();
            (state, summaries)
        })
        .collect::<BTreeMap<_, _>>();
    info!(
        "Computed statistics for {} column(s) across {} state(s)",
        numeric.len(),
        groups.len()
    );
    Ok(StatsTable {
        columns: numeric.into_iter().map(|(_, name)| name).collect(),
        groups,
    })
}

/// `total_long_term_debt / total_revenue` for every row. Zero revenue yields
/// NaN; a null operand yields a null ratio.
pub fn compute_debt_to_income(table: &Table) -> Result<Table> {
    let projected = table.select(&[BUSINESS_ID, TOTAL_LONG_TERM_DEBT, TOTAL_REVENUE])?;
    let (mut columns, mut rows) = projected.into_parts();
    let mut undefined = 0usize;
    for row in &mut rows {
        let debt = row[1].as_ref().and_then(Value::as_f64);
        let revenue = row[2].as_ref().and_then(Value::as_f64);
        let ratio = match (debt, revenue) {
            (Some(_), Some(revenue)) if revenue == 0.0 => {
                undefined += 1;
                Some(f64::NAN)
            }
            (Some(debt), Some(revenue)) => Some(debt / revenue),
            _ => None,
        };
        row.push(ratio.map(Value::Float));
    }
    columns.push(Column::new(DEBT_TO_INCOME_RATIO, ColumnType::Float));
    if undefined > 0 {
        warn!("{undefined} row(s) have zero revenue; their debt-to-income ratio is NaN");
    }
    Ok(Table::from_parts(columns, rows))
}

/// Count of non-null cells per column, in column order.
pub fn non_null_counts(table: &Table) -> Vec<(String, usize)> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let count = table.column_values(idx).filter(Option::is_some).count();
            (column.name.clone(), count)
        })
        .collect()
}
