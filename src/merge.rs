use std::collections::HashMap;

use log::{info, warn};

use crate::{
    data::Value,
    error::Result,
    frame::Table,
    mapping::{BUSINESS_ID, DEBT_TO_INCOME_RATIO},
};

/// Result of an inner join together with how many rows on each side found
/// no partner.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub table: Table,
    pub unmatched_base: usize,
    pub unmatched_ratio: usize,
}

impl MergeOutcome {
    pub fn dropped_rows(&self) -> usize {
        self.unmatched_base + self.unmatched_ratio
    }
}

/// Inner-joins `ratios` onto `base` by `business_id`, appending only the
/// `debt_to_income_ratio` column. Repeated keys produce every pairing,
/// ordered by base row and then ratio row. Null keys never match.
pub fn merge(base: &Table, ratios: &Table) -> Result<MergeOutcome> {
    let base_key = base.require_column(BUSINESS_ID)?;
    let ratio_key = ratios.require_column(BUSINESS_ID)?;
    let ratio_idx = ratios.require_column(DEBT_TO_INCOME_RATIO)?;

    let mut lookup: HashMap<&Value, Vec<(usize, Option<&Value>)>> = HashMap::new();
    for (row_idx, row) in ratios.rows().iter().enumerate() {
        if let Some(key) = row[ratio_key].as_ref() {
            lookup
                .entry(key)
                .or_default()
                .push((row_idx, row[ratio_idx].as_ref()));
        }
    }

    let mut columns = base.columns().to_vec();
    columns.push(ratios.columns()[ratio_idx].clone());

    let mut matched_ratio = vec![false; ratios.len()];
    let mut unmatched_base = 0usize;
    let mut rows = Vec::new();
    for row in base.rows() {
        let bucket = row[base_key].as_ref().and_then(|key| lookup.get(key));
        let Some(bucket) = bucket else {
            unmatched_base += 1;
            continue;
        };
        for (ratio_row, ratio) in bucket {
            matched_ratio[*ratio_row] = true;
            let mut combined = row.clone();
            combined.push(ratio.cloned());
            rows.push(combined);
        }
    }
    let unmatched_ratio = matched_ratio.iter().filter(|m| !**m).count();

    if unmatched_base > 0 || unmatched_ratio > 0 {
        warn!(
            "Join on '{BUSINESS_ID}' dropped {unmatched_base} base row(s) and {unmatched_ratio} ratio row(s) without a match"
        );
    }
    info!("Merged table has {} row(s)", rows.len());
    Ok(MergeOutcome {
        table: Table::from_parts(columns, rows),
        unmatched_base,
        unmatched_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::ColumnType,
        frame::{Column, Row},
    };

    fn base(ids: &[i64]) -> Table {
        let rows = ids
            .iter()
            .map(|id| vec![Some(Value::Integer(*id)), Some(Value::String(format!("b{id}")))])
            .collect();
        Table::from_rows(
            vec![
                Column::new(BUSINESS_ID, ColumnType::Integer),
                Column::new("label", ColumnType::String),
            ],
            rows,
        )
        .expect("base")
    }

    fn ratios(pairs: &[(i64, f64)]) -> Table {
        let rows: Vec<Row> = pairs
            .iter()
            .map(|(id, ratio)| vec![Some(Value::Integer(*id)), Some(Value::Float(*ratio))])
            .collect();
        Table::from_rows(
            vec![
                Column::new(BUSINESS_ID, ColumnType::Integer),
                Column::new(DEBT_TO_INCOME_RATIO, ColumnType::Float),
            ],
            rows,
        )
        .expect("ratios")
    }

    #[test]
    fn merge_drops_unmatched_rows_and_counts_them() {
        let outcome = merge(&base(&[1, 2, 3]), &ratios(&[(1, 0.5), (3, 0.25), (9, 1.0)]))
            .expect("merge");
        assert_eq!(outcome.table.len(), 2);
        assert_eq!(outcome.unmatched_base, 1);
        assert_eq!(outcome.unmatched_ratio, 1);
        assert_eq!(
            outcome.table.headers(),
            vec![BUSINESS_ID, "label", DEBT_TO_INCOME_RATIO]
        );
        assert_eq!(outcome.table.value(1, 2), Some(&Value::Float(0.25)));
    }

    #[test]
    fn merge_cross_multiplies_repeated_keys() {
        let outcome = merge(&base(&[1, 1]), &ratios(&[(1, 0.1), (1, 0.2)])).expect("merge");
        assert_eq!(outcome.table.len(), 4);
        let ratios = outcome
            .table
            .column_values(2)
            .map(|v| v.and_then(Value::as_f64))
            .collect::<Vec<_>>();
        assert_eq!(ratios, vec![Some(0.1), Some(0.2), Some(0.1), Some(0.2)]);
        assert_eq!(outcome.dropped_rows(), 0);
    }

    #[test]
    fn merge_requires_key_columns() {
        let no_key = Table::new(vec![Column::new("x", ColumnType::Integer)]);
        assert!(merge(&no_key, &ratios(&[])).is_err());
    }
}
