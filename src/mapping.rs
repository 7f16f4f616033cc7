//! Raw-header to canonical-column mapping and target dtypes.
//!
//! A [`SchemaMapping`] is built once (either [`SchemaMapping::business_default`]
//! or loaded from a YAML file) and then shared read-only by the normalizer.
//! Lookups never fail: unknown headers pass through verbatim and columns
//! without a declared dtype are left untouched.
//!
//! The YAML layout is a `columns` list:
//!
//! ```yaml
//! columns:
//!   - source: Business ID
//!     name: business_id
//!     datatype: Integer
//! ```

use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::BufReader,
    path::Path,
};

use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};

use crate::{
    data::{ColumnType, Value},
    error::{PipelineError, Result},
};

pub const BUSINESS_ID: &str = "business_id";
pub const BUSINESS_STATE: &str = "business_state";
pub const TOTAL_LONG_TERM_DEBT: &str = "total_long_term_debt";
pub const TOTAL_EQUITY: &str = "total_equity";
pub const DEBT_TO_EQUITY: &str = "debt_to_equity";
pub const TOTAL_LIABILITIES: &str = "total_liabilities";
pub const TOTAL_REVENUE: &str = "total_revenue";
pub const PROFIT_MARGIN: &str = "profit_margin";
pub const DEBT_TO_INCOME_RATIO: &str = "debt_to_income_ratio";

const BUSINESS_COLUMNS: &[(&str, &str, ColumnType)] = &[
    ("Business ID", BUSINESS_ID, ColumnType::Integer),
    ("Business State", BUSINESS_STATE, ColumnType::String),
    ("Total Long-term Debt", TOTAL_LONG_TERM_DEBT, ColumnType::Integer),
    ("Total Equity", TOTAL_EQUITY, ColumnType::Integer),
    ("Debt to Equity", DEBT_TO_EQUITY, ColumnType::Float),
    ("Total Liabilities", TOTAL_LIABILITIES, ColumnType::Integer),
    ("Total Revenue", TOTAL_REVENUE, ColumnType::Integer),
    ("Profit Margin", PROFIT_MARGIN, ColumnType::Float),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnMapping {
    pub source: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<ColumnType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MappingFile {
    columns: Vec<ColumnMapping>,
}

#[derive(Debug, Clone)]
pub struct SchemaMapping {
    entries: Vec<ColumnMapping>,
    names: HashMap<String, usize>,
    types: HashMap<String, ColumnType>,
}

impl SchemaMapping {
    pub fn new(entries: Vec<ColumnMapping>) -> Result<Self> {
        validate_entries(&entries)?;
        Ok(Self::build(entries))
    }

    pub fn business_default() -> Self {
        let entries = BUSINESS_COLUMNS
            .iter()
            .map(|(source, name, datatype)| ColumnMapping {
                source: source.to_string(),
                name: name.to_string(),
                datatype: Some(*datatype),
            })
            .collect();
        Self::build(entries)
    }

    fn build(entries: Vec<ColumnMapping>) -> Self {
        let names = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.source.clone(), idx))
            .collect();
        let types = entries
            .iter()
            .filter_map(|entry| entry.datatype.map(|ty| (entry.name.clone(), ty)))
            .collect();
        Self {
            entries,
            names,
            types,
        }
    }

    pub fn entries(&self) -> &[ColumnMapping] {
        &self.entries
    }

    pub fn canonical_name<'a>(&'a self, raw: &'a str) -> &'a str {
        self.names
            .get(raw)
            .map(|idx| self.entries[*idx].name.as_str())
            .unwrap_or(raw)
    }

    pub fn target_type(&self, canonical: &str) -> Option<ColumnType> {
        self.types.get(canonical).copied()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| PipelineError::io(path, err))?;
        let parsed: MappingFile = serde_yaml::from_reader(BufReader::new(file))?;
        Self::new(parsed.columns)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        let file = MappingFile {
            columns: self.entries.clone(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered = self.to_yaml_string()?;
        std::fs::write(path, rendered).map_err(|err| PipelineError::io(path, err))
    }

    /// Proposes a mapping for a file's headers: snake_case names and the
    /// narrowest dtype that parses every non-empty sampled value.
    pub fn propose(headers: &[String], sample_rows: &[Vec<String>]) -> Result<Self> {
        let entries = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| ColumnMapping {
                source: header.clone(),
                name: header.to_snake_case(),
                datatype: Some(narrowest_type(
                    sample_rows.iter().filter_map(|row| row.get(idx)),
                )),
            })
            .collect();
        Self::new(entries)
    }
}

impl Default for SchemaMapping {
    fn default() -> Self {
        Self::business_default()
    }
}

fn validate_entries(entries: &[ColumnMapping]) -> Result<()> {
    let mut sources = HashSet::with_capacity(entries.len());
    let mut names = HashSet::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        if entry.source.trim().is_empty() || entry.name.trim().is_empty() {
            return Err(PipelineError::schema(format!(
                "Entry {} must declare both a source header and a name",
                idx + 1
            )));
        }
        if !sources.insert(entry.source.as_str()) {
            return Err(PipelineError::schema(format!(
                "Source header '{}' is mapped more than once",
                entry.source
            )));
        }
        if !names.insert(entry.name.as_str()) {
            return Err(PipelineError::schema(format!(
                "Canonical name '{}' is declared more than once",
                entry.name
            )));
        }
    }
    Ok(())
}

fn narrowest_type<'a, I>(values: I) -> ColumnType
where
    I: Iterator<Item = &'a String>,
{
    let mut integer = true;
    let mut float = true;
    let mut seen = false;
    for value in values.filter(|v| !v.trim().is_empty()) {
        seen = true;
        integer &= value.trim().parse::<i64>().is_ok();
        float &= Value::String(value.clone())
            .convert(ColumnType::Float)
            .is_some();
        if !integer && !float {
            break;
        }
    }
    match (seen, integer, float) {
        (false, _, _) => ColumnType::String,
        (true, true, _) => ColumnType::Integer,
        (true, false, true) => ColumnType::Float,
        _ => ColumnType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn business_default_maps_every_known_header() {
        let mapping = SchemaMapping::business_default();
        assert_eq!(mapping.canonical_name("Business ID"), BUSINESS_ID);
        assert_eq!(
            mapping.canonical_name("Total Long-term Debt"),
            TOTAL_LONG_TERM_DEBT
        );
        assert_eq!(mapping.canonical_name("Profit Margin"), PROFIT_MARGIN);
        assert_eq!(mapping.target_type(DEBT_TO_EQUITY), Some(ColumnType::Float));
        assert_eq!(mapping.target_type(BUSINESS_STATE), Some(ColumnType::String));
    }

    #[test]
    fn unknown_headers_pass_through() {
        let mapping = SchemaMapping::business_default();
        assert_eq!(mapping.canonical_name("Region Code"), "Region Code");
        assert_eq!(mapping.target_type("Region Code"), None);
    }

    #[test]
    fn new_rejects_duplicate_sources() {
        let entry = ColumnMapping {
            source: "A".into(),
            name: "a".into(),
            datatype: None,
        };
        let other = ColumnMapping {
            name: "b".into(),
            ..entry.clone()
        };
        let err = SchemaMapping::new(vec![entry, other]).expect_err("duplicate source");
        assert!(err.to_string().contains("mapped more than once"));
    }

    #[test]
    fn yaml_round_trip_preserves_entries() {
        let mapping = SchemaMapping::business_default();
        let file = NamedTempFile::new().expect("temp file");
        mapping.save(file.path()).expect("save mapping");
        let loaded = SchemaMapping::load(file.path()).expect("load mapping");
        assert_eq!(loaded.entries(), mapping.entries());
    }

    #[test]
    fn propose_snake_cases_headers_and_infers_types() {
        let headers = vec![
            "Total Long-term Debt".to_string(),
            "Debt to Equity".to_string(),
            "Business State".to_string(),
        ];
        let rows = vec![
            vec!["100".to_string(), "2".to_string(), "CA".to_string()],
            vec!["200".to_string(), "-1.5".to_string(), "NY".to_string()],
        ];
        let mapping = SchemaMapping::propose(&headers, &rows).expect("propose");
        assert_eq!(mapping.canonical_name("Total Long-term Debt"), "total_long_term_debt");
        assert_eq!(
            mapping.target_type("total_long_term_debt"),
            Some(ColumnType::Integer)
        );
        assert_eq!(mapping.target_type("debt_to_equity"), Some(ColumnType::Float));
        assert_eq!(mapping.target_type("business_state"), Some(ColumnType::String));
    }
}
