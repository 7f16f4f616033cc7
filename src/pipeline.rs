//! End-to-end run: load, normalize, analyze and merge one file.
//!
//! Stage order is fixed: floats are rounded before the ratio is derived and
//! the ratio column itself is never rounded.

use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use log::info;

use crate::{
    analyze::{self, StatsTable},
    error::Result,
    frame::Table,
    io_utils,
    mapping::SchemaMapping,
    merge::{self, MergeOutcome},
    normalize::{self, DEFAULT_ROUND_PLACES, DUPLICATE_FLAG, Normalizer},
};

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub round_places: u32,
    pub drop_duplicates: bool,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            round_places: DEFAULT_ROUND_PLACES,
            drop_duplicates: false,
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Typed, rounded table without the duplicate flag.
    pub normalized: Table,
    /// Rows flagged as duplicates, including the `is_dup` column.
    pub duplicates: Table,
    pub unique_rows: usize,
    pub duplicate_rows: usize,
    pub non_null_counts: Vec<(String, usize)>,
    pub negative_debt_to_equity: Table,
    pub stats: StatsTable,
    pub debt_to_income: Table,
    pub merged: MergeOutcome,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    normalizer: Normalizer,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(mapping: SchemaMapping, options: PipelineOptions) -> Self {
        Self {
            normalizer: Normalizer::new(mapping),
            options,
        }
    }

    pub fn run(&self, path: &Path) -> Result<PipelineOutput> {
        let delimiter = io_utils::resolve_input_delimiter(path, self.options.delimiter);
        let raw = io_utils::load_table(path, delimiter, self.options.encoding)?;
        info!(
            "Loaded {} row(s) and {} column(s) from {:?}",
            raw.len(),
            raw.width(),
            path
        );
        self.process(raw)
    }

    /// Runs every stage after loading on an all-text table.
    pub fn process(&self, raw: Table) -> Result<PipelineOutput> {
        let named = self.normalizer.normalize_names(raw);
        let typed = self.normalizer.coerce_types(named)?;

        let report = self.normalizer.detect_duplicates(typed);
        let unique_rows = report.unique_count();
        let duplicate_rows = report.duplicate_count();
        info!("{unique_rows} unique row(s), {duplicate_rows} duplicate row(s)");

        let mut table = self.normalizer.drop_column(report.table, DUPLICATE_FLAG)?;
        if self.options.drop_duplicates {
            table = normalize::drop_duplicate_rows(table);
            info!("Dropped duplicates; {} row(s) remain", table.len());
        }
        let non_null_counts = analyze::non_null_counts(&table);
        let normalized = self
            .normalizer
            .round_floats(table, self.options.round_places);

        let negative_debt_to_equity = analyze::filter_negative_debt_to_equity(&normalized)?;
        let stats = analyze::compute_group_stats(&normalized)?;
        let debt_to_income = analyze::compute_debt_to_income(&normalized)?;
        let merged = merge::merge(&normalized, &debt_to_income)?;

        Ok(PipelineOutput {
            normalized,
            duplicates: report.duplicates,
            unique_rows,
            duplicate_rows,
            non_null_counts,
            negative_debt_to_equity,
            stats,
            debt_to_income,
            merged,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(SchemaMapping::business_default(), PipelineOptions::default())
    }
}
