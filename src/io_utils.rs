//! I/O utilities for CSV reading, writing, encoding, and delimiter resolution.
//!
//! All file I/O in finratio flows through this module:
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Loading**: [`load_table`] parses a whole file into a [`Table`] of
//!   string columns; typing is left to the normalizer.
//! - **Writing**: [`write_table`] emits a table as CSV to a file or stdout.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    data::{ColumnType, Value, display_cell},
    error::{PipelineError, Result},
    frame::{Column, Table},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| PipelineError::parse(format!("Unknown encoding '{value}'")))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, fallback: u8) -> u8 {
    match path.and_then(|p| p.extension()).and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        Some(ext) if ext.eq_ignore_ascii_case("csv") => DEFAULT_CSV_DELIMITER,
        _ => fallback,
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).map_err(|err| PipelineError::io(path, err))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).map_err(|err| PipelineError::io(p, err))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(writer))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(PipelineError::parse(format!(
            "Failed to decode text with encoding {}",
            encoding.name()
        )))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Converts a csv error raised while reading `path`. Read failures keep
/// their `io::Error` and the path; everything else is malformed input.
pub fn map_csv_error(path: &Path, err: csv::Error) -> PipelineError {
    if !err.is_io_error() {
        return PipelineError::from(err);
    }
    match err.into_kind() {
        csv::ErrorKind::Io(source) => PipelineError::io(path, source),
        other => PipelineError::parse(format!("{other:?}")),
    }
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    path: &Path,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader
        .byte_headers()
        .map_err(|err| map_csv_error(path, err))?
        .clone();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(PipelineError::parse("Input is missing a header row"));
    }
    decode_record(&headers, encoding)
}

/// Reads the header row and up to `limit` raw records (`None` reads all).
pub fn read_records(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    limit: Option<usize>,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    let headers = reader_headers(&mut reader, path, encoding)?;
    let mut rows = Vec::new();
    for record in reader.byte_records() {
        if limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }
        let record = record.map_err(|err| map_csv_error(path, err))?;
        rows.push(decode_record(&record, encoding)?);
    }
    Ok((headers, rows))
}

/// Parses a delimited file into a table whose columns are all `String`.
/// Empty fields become nulls.
pub fn load_table(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Table> {
    let (headers, records) = read_records(path, delimiter, encoding, None)?;
    let columns = headers
        .into_iter()
        .map(|name| Column::new(name, ColumnType::String))
        .collect::<Vec<_>>();
    let rows = records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .map(|field| (!field.is_empty()).then_some(Value::String(field)))
                .collect()
        })
        .collect();
    debug!("Loaded {} column(s) from {:?}", columns.len(), path);
    Table::from_rows(columns, rows)
}

pub fn write_table(table: &Table, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let target = path.unwrap_or(Path::new("-"));
    let mut writer = open_csv_writer(path, delimiter)?;
    writer
        .write_record(table.headers())
        .map_err(|err| map_csv_error(target, err))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|cell| display_cell(cell.as_ref())))
            .map_err(|err| map_csv_error(target, err))?;
    }
    writer.flush().map_err(|err| PipelineError::io(target, err))
}
