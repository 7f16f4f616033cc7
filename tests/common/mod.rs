#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use finratio::{
    data::{ColumnType, Value},
    frame::{Column, Row, Table},
};
use tempfile::{TempDir, tempdir};

pub const BUSINESS_HEADERS: &str = "Business ID,Business State,Total Long-term Debt,Total Equity,Debt to Equity,Total Liabilities,Total Revenue,Profit Margin";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Builds an all-text table the way the loader does: empty cells are null.
pub fn raw_table(headers: &[&str], rows: &[&[&str]]) -> Table {
    let columns = headers
        .iter()
        .map(|h| Column::new(*h, ColumnType::String))
        .collect();
    let rows = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| (!cell.is_empty()).then(|| Value::String(cell.to_string())))
                .collect::<Row>()
        })
        .collect();
    Table::from_rows(columns, rows).expect("raw table")
}

pub fn business_csv(rows: &[&str]) -> String {
    let mut contents = String::from(BUSINESS_HEADERS);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    contents
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
