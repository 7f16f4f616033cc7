//! Reporting sinks fed by the merged table.
//!
//! [`ChartDataSink`] does not draw images. It writes the exact series each
//! chart plots (one CSV per chart) plus a `manifest.json`, leaving rendering
//! to whatever plotting tool consumes the directory.

use std::{collections::BTreeMap, fs, path::PathBuf};

use chrono::{SecondsFormat, Utc};
use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    analyze::StatsTable,
    data::{ColumnType, Value},
    error::{PipelineError, Result},
    frame::{Column, Table},
    io_utils,
    mapping::{BUSINESS_STATE, DEBT_TO_INCOME_RATIO, TOTAL_LIABILITIES, TOTAL_REVENUE},
};

pub const TOP_STATES: usize = 5;
const BILLION: f64 = 1e9;

pub trait ReportingSink {
    fn publish(&mut self, merged: &Table, stats: &StatsTable) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct Manifest {
    generated_at: String,
    merged_rows: usize,
    states: usize,
    files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ChartDataSink {
    dir: PathBuf,
}

impl ChartDataSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write(&self, name: &str, table: &Table) -> Result<String> {
        let file = format!("{name}.csv");
        io_utils::write_table(table, Some(&self.dir.join(&file)), b',')?;
        Ok(file)
    }
}

impl ReportingSink for ChartDataSink {
    fn publish(&mut self, merged: &Table, stats: &StatsTable) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|err| PipelineError::io(&self.dir, err))?;
        let files = vec![
            self.write("bar_chart", &top_liabilities_by_state(merged)?)?,
            self.write("pie_chart", &revenue_share(merged)?)?,
            self.write("scatterplot", &revenue_vs_debt_to_income(merged)?)?,
            self.write("hor_bar_chart", &business_count_by_state(merged)?)?,
            self.write("stats", &stats.to_table())?,
        ];
        let manifest = Manifest {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            merged_rows: merged.len(),
            states: stats.group_count(),
            files,
        };
        let manifest_path = self.dir.join("manifest.json");
        let rendered = serde_json::to_string_pretty(&manifest)
            .map_err(|err| PipelineError::report(&manifest_path, err.to_string()))?;
        fs::write(&manifest_path, rendered).map_err(|err| PipelineError::io(&manifest_path, err))?;
        info!(
            "Wrote {} chart dataset(s) to {:?}",
            manifest.files.len(),
            self.dir
        );
        Ok(())
    }
}

fn state_of(table: &Table, row: usize, state_idx: usize) -> Option<String> {
    table.value(row, state_idx).map(Value::as_display)
}

/// The five states whose single largest `total_liabilities` row ranks
/// highest, with the amount expressed in billions.
pub fn top_liabilities_by_state(merged: &Table) -> Result<Table> {
    let state_idx = merged.require_column(BUSINESS_STATE)?;
    let liabilities_idx = merged.require_column(TOTAL_LIABILITIES)?;
    let ranked = (0..merged.len())
        .filter_map(|row| {
            let state = state_of(merged, row, state_idx)?;
            let amount = merged.value(row, liabilities_idx)?.as_f64()?;
            Some((state, amount))
        })
        .sorted_by(|a, b| b.1.total_cmp(&a.1))
        .unique_by(|(state, _)| state.clone())
        .take(TOP_STATES)
        .map(|(state, amount)| {
            vec![
                Some(Value::String(state)),
                Some(Value::Float(amount)),
                Some(Value::Float(amount / BILLION)),
            ]
        })
        .collect();
    Ok(Table::from_parts(
        vec![
            Column::new(BUSINESS_STATE, ColumnType::String),
            Column::new(TOTAL_LIABILITIES, ColumnType::Float),
            Column::new("total_liabilities_billion", ColumnType::Float),
        ],
        ranked,
    ))
}

/// Summed revenue for the first five states in alphabetical order and each
/// one's percentage of that five-state total.
pub fn revenue_share(merged: &Table) -> Result<Table> {
    let sums = sum_by_state(merged, TOTAL_REVENUE)?;
    let top = sums.into_iter().take(TOP_STATES).collect_vec();
    let total: f64 = top.iter().map(|(_, sum)| *sum).sum();
    let rows = top
        .into_iter()
        .map(|(state, sum)| {
            let share = if total == 0.0 {
                f64::NAN
            } else {
                sum * 100.0 / total
            };
            vec![
                Some(Value::String(state)),
                Some(Value::Float(sum)),
                Some(Value::Float(share)),
            ]
        })
        .collect();
    Ok(Table::from_parts(
        vec![
            Column::new(BUSINESS_STATE, ColumnType::String),
            Column::new(TOTAL_REVENUE, ColumnType::Float),
            Column::new("share_percent", ColumnType::Float),
        ],
        rows,
    ))
}

/// Per-state mean revenue against mean debt-to-income ratio. Non-finite
/// ratios are left out of the mean.
pub fn revenue_vs_debt_to_income(merged: &Table) -> Result<Table> {
    let revenue = finite_values_by_state(merged, TOTAL_REVENUE)?;
    let ratio = finite_values_by_state(merged, DEBT_TO_INCOME_RATIO)?;
    let mean = |values: Option<&Vec<f64>>| match values {
        Some(values) if !values.is_empty() => values.iter().sum::<f64>() / values.len() as f64,
        _ => f64::NAN,
    };
    let rows = revenue
        .keys()
        .chain(ratio.keys())
        .unique()
        .sorted()
        .map(|state| {
            vec![
                Some(Value::String(state.clone())),
                Some(Value::Float(mean(revenue.get(state)))),
                Some(Value::Float(mean(ratio.get(state)))),
            ]
        })
        .collect();
    Ok(Table::from_parts(
        vec![
            Column::new(BUSINESS_STATE, ColumnType::String),
            Column::new("avg_revenue", ColumnType::Float),
            Column::new("avg_debt_to_income_ratio", ColumnType::Float),
        ],
        rows,
    ))
}

pub fn business_count_by_state(merged: &Table) -> Result<Table> {
    let state_idx = merged.require_column(BUSINESS_STATE)?;
    let counts = (0..merged.len())
        .filter_map(|row| state_of(merged, row, state_idx))
        .counts()
        .into_iter()
        .sorted()
        .map(|(state, count)| {
            vec![
                Some(Value::String(state)),
                Some(Value::Integer(count as i64)),
            ]
        })
        .collect();
    Ok(Table::from_parts(
        vec![
            Column::new(BUSINESS_STATE, ColumnType::String),
            Column::new("cnt_of_businesses", ColumnType::Integer),
        ],
        counts,
    ))
}

fn sum_by_state(merged: &Table, column: &str) -> Result<BTreeMap<String, f64>> {
    Ok(finite_values_by_state(merged, column)?
        .into_iter()
        .map(|(state, values)| (state, values.iter().sum()))
        .collect())
}

fn finite_values_by_state(merged: &Table, column: &str) -> Result<BTreeMap<String, Vec<f64>>> {
    let state_idx = merged.require_column(BUSINESS_STATE)?;
    let value_idx = merged.require_column(column)?;
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in 0..merged.len() {
        let Some(state) = state_of(merged, row, state_idx) else {
            continue;
        };
        let values = grouped.entry(state).or_default();
        if let Some(value) = merged.value(row, value_idx).and_then(Value::as_f64)
            && value.is_finite()
        {
            values.push(value);
        }
    }
    Ok(grouped)
}
