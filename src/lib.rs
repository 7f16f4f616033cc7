pub mod analyze;
pub mod cli;
pub mod data;
pub mod error;
pub mod frame;
pub mod io_utils;
pub mod mapping;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod table;

use std::{
    collections::BTreeMap,
    env, io,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    analyze::Summary,
    cli::{Cli, Commands, InputArgs, SchemaCommands},
    frame::Table,
    mapping::SchemaMapping,
    normalize::Normalizer,
    pipeline::{Pipeline, PipelineOptions, PipelineOutput},
    report::{ChartDataSink, ReportingSink},
    source::{DirectoryLookup, FixedPath, Prompt, SourceLocator},
    table::Align,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("finratio", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::Stats(args) => handle_stats(&args),
        Commands::Schema(args) => match args.command {
            SchemaCommands::Show(show) => handle_schema_show(&show),
            SchemaCommands::Init(init) => handle_schema_init(&init),
        },
        Commands::Preview(args) => handle_preview(&args),
    }
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let Some(path) = resolve_source(&args.input)? else {
        println!("Exiting.");
        return Ok(());
    };
    let options = PipelineOptions {
        round_places: args.round_places,
        drop_duplicates: args.drop_duplicates,
        ..pipeline_options(&args.input)?
    };
    info!(
        "Running pipeline on '{}' with delimiter '{}'",
        path.display(),
        printable_delimiter(io_utils::resolve_input_delimiter(&path, options.delimiter))
    );
    let pipeline = Pipeline::new(load_mapping(args.input.schema.as_deref())?, options);
    let output = pipeline
        .run(&path)
        .with_context(|| format!("Processing {path:?}"))?;

    if !args.quiet {
        print_report(&output);
    }
    if let Some(target) = &args.output {
        let delimiter = io_utils::resolve_output_delimiter(Some(target), b',');
        io_utils::write_table(&output.merged.table, Some(target), delimiter)
            .with_context(|| format!("Writing merged table to {target:?}"))?;
        info!(
            "Merged table with {} row(s) written to {:?}",
            output.merged.table.len(),
            target
        );
    }
    if let Some(dir) = &args.report_dir {
        ChartDataSink::new(dir)
            .publish(&output.merged.table, &output.stats)
            .with_context(|| format!("Publishing chart datasets to {dir:?}"))?;
    }
    Ok(())
}

fn handle_stats(args: &cli::StatsArgs) -> Result<()> {
    let Some(path) = resolve_source(&args.input)? else {
        println!("Exiting.");
        return Ok(());
    };
    let pipeline = Pipeline::new(
        load_mapping(args.input.schema.as_deref())?,
        pipeline_options(&args.input)?,
    );
    let output = pipeline
        .run(&path)
        .with_context(|| format!("Computing statistics for {path:?}"))?;
    if args.json {
        let nested = output
            .stats
            .states()
            .map(|state| {
                let columns = output
                    .stats
                    .columns()
                    .iter()
                    .filter_map(|column| {
                        output
                            .stats
                            .summary(state, column)
                            .map(|summary| (column.as_str(), summary))
                    })
                    .collect::<BTreeMap<&str, &Summary>>();
                (state, columns)
            })
            .collect::<BTreeMap<_, _>>();
        let rendered =
            serde_json::to_string_pretty(&nested).context("Serializing statistics as JSON")?;
        println!("{rendered}");
    } else {
        table::print(&output.stats.to_table());
    }
    Ok(())
}

fn handle_schema_show(args: &cli::SchemaShowArgs) -> Result<()> {
    let mapping = load_mapping(args.schema.as_deref())?;
    let headers = ["source", "name", "type"].map(str::to_string);
    let rows = mapping
        .entries()
        .iter()
        .map(|entry| {
            vec![
                entry.source.clone(),
                entry.name.clone(),
                entry
                    .datatype
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect::<Vec<_>>();
    print!("{}", table::render_rows(&headers, &rows, &[Align::Left; 3]));
    Ok(())
}

fn handle_schema_init(args: &cli::SchemaInitArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Proposing mapping for '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let limit = (args.sample_rows > 0).then_some(args.sample_rows);
    let (headers, sample) = io_utils::read_records(&args.input, delimiter, encoding, limit)
        .with_context(|| format!("Reading sample rows from {:?}", args.input))?;
    debug!("Sampled {} row(s) for type proposal", sample.len());
    let mapping = SchemaMapping::propose(&headers, &sample)
        .with_context(|| format!("Proposing mapping for {:?}", args.input))?;
    mapping
        .save(&args.output)
        .with_context(|| format!("Writing mapping to {:?}", args.output))?;
    info!(
        "Mapping for {} column(s) written to {:?}",
        mapping.entries().len(),
        args.output
    );
    Ok(())
}

fn handle_preview(args: &cli::PreviewArgs) -> Result<()> {
    let Some(path) = resolve_source(&args.input)? else {
        println!("Exiting.");
        return Ok(());
    };
    let options = pipeline_options(&args.input)?;
    let delimiter = io_utils::resolve_input_delimiter(&path, options.delimiter);
    let raw = io_utils::load_table(&path, delimiter, options.encoding)
        .with_context(|| format!("Loading {path:?}"))?;
    let normalizer = Normalizer::new(load_mapping(args.input.schema.as_deref())?);
    let typed = normalizer
        .coerce_types(normalizer.normalize_names(raw))
        .with_context(|| format!("Normalizing {path:?}"))?;
    let (columns, rows) = typed.into_parts();
    let head = rows.into_iter().take(args.rows).collect();
    table::print(&Table::from_parts(columns, head));
    Ok(())
}

fn print_report(output: &PipelineOutput) {
    print_section("Duplicate records");
    table::print(&output.duplicates);

    print_section("Row counts");
    println!("Unique rows: {}", output.unique_rows);
    println!("Duplicate rows: {}", output.duplicate_rows);

    print_section("Non-null counts");
    let rows = output
        .non_null_counts
        .iter()
        .map(|(column, count)| vec![column.clone(), count.to_string()])
        .collect::<Vec<_>>();
    print!(
        "{}",
        table::render_rows(
            &["column".to_string(), "non_null".to_string()],
            &rows,
            &[Align::Left, Align::Right]
        )
    );

    print_section("Businesses with negative debt-to-equity");
    table::print(&output.negative_debt_to_equity);

    print_section("Statistics by state");
    table::print(&output.stats.to_table());

    print_section("Debt-to-income ratio");
    table::print(&output.debt_to_income);

    print_section("Merged table");
    table::print(&output.merged.table);
}

fn print_section(title: &str) {
    println!();
    println!("== {title} ==");
}

fn resolve_source(args: &InputArgs) -> Result<Option<PathBuf>> {
    if let Some(input) = &args.input {
        return FixedPath::new(input)
            .resolve_input_path()?
            .map(Some)
            .ok_or_else(|| anyhow!("Input file {input:?} not found"));
    }
    if let Some(name) = &args.name {
        return DirectoryLookup::new(&args.source_dir, name)
            .resolve_input_path()?
            .map(Some)
            .ok_or_else(|| anyhow!("No source file named '{name}' in {:?}", args.source_dir));
    }
    let stdin = io::stdin();
    let resolved =
        Prompt::new(&args.source_dir, stdin.lock(), io::stdout()).resolve_input_path()?;
    Ok(resolved)
}

fn pipeline_options(args: &InputArgs) -> Result<PipelineOptions> {
    Ok(PipelineOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        ..PipelineOptions::default()
    })
}

fn load_mapping(path: Option<&Path>) -> Result<SchemaMapping> {
    match path {
        Some(path) => {
            SchemaMapping::load(path).with_context(|| format!("Loading mapping from {path:?}"))
        }
        None => Ok(SchemaMapping::business_default()),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
