use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize business financials, derive ratios and summarize by state",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline and print every report section
    Run(RunArgs),
    /// Print per-state descriptive statistics only
    Stats(StatsArgs),
    /// Inspect or draft schema mapping files
    Schema(SchemaArgs),
    /// Show the first rows of a file after normalization
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// CSV file to read ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Directory searched for `<name>.csv` when --input is omitted
    #[arg(long = "source-dir", default_value = "source_data")]
    pub source_dir: PathBuf,
    /// File stem to look up in --source-dir; prompts on stdin when omitted
    #[arg(long = "name")]
    pub name: Option<String>,
    /// Schema mapping YAML (defaults to the built-in business mapping)
    #[arg(short = 's', long = "schema")]
    pub schema: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Decimal places for float columns (round half to even)
    #[arg(
        long = "round-places",
        default_value_t = 2,
        value_parser = clap::value_parser!(u32).range(0..=15)
    )]
    pub round_places: u32,
    /// Keep only the first occurrence of duplicate rows before analysis
    #[arg(long = "drop-duplicates")]
    pub drop_duplicates: bool,
    /// Write the merged table to this CSV file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Directory receiving chart datasets and a manifest
    #[arg(long = "report-dir")]
    pub report_dir: Option<PathBuf>,
    /// Skip printing report sections
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Emit statistics as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub command: SchemaCommands,
}

#[derive(Debug, Subcommand)]
pub enum SchemaCommands {
    /// List source headers, canonical names and target types
    Show(SchemaShowArgs),
    /// Draft a mapping file from a CSV file's headers and sample values
    Init(SchemaInitArgs),
}

#[derive(Debug, Args)]
pub struct SchemaShowArgs {
    /// Schema mapping YAML (defaults to the built-in business mapping)
    #[arg(short = 's', long = "schema")]
    pub schema: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SchemaInitArgs {
    /// CSV file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination mapping YAML
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Number of rows sampled when proposing types (0 means full scan)
    #[arg(long = "sample-rows", default_value_t = 2000)]
    pub sample_rows: usize,
    /// CSV delimiter character
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
