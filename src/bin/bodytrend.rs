//! bodytrend CLI - Command-line interface for the body-composition trend engine
//!
//! Commands:
//! - process: Emit the processed table (CSV or JSON)
//! - persons: List person identifiers
//! - latest: Latest values with deltas for one person
//! - series: History for one person, newest first
//! - report: Full JSON report for one person
//! - doctor: Diagnose configuration, source and schema
//! - schema: Print the known source layouts

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::info;

use bodytrend::encoder::{write_processed_csv, ReportEncoder};
use bodytrend::types::{Metric, SeriesPoint};
use bodytrend::{
    CsvReaderSource, PipelineConfig, ProcessedTable, SchemaMapping, TableSource,
    TrendError, TrendProcessor, BODYTREND_VERSION, PRODUCER_NAME,
};

/// bodytrend - Body-composition trends from self-reported measurements
#[derive(Parser)]
#[command(name = "bodytrend")]
#[command(version = BODYTREND_VERSION)]
#[command(about = "Clean, derive and difference body-composition measurements", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Input CSV (repeat for fallbacks, use - for stdin); overrides config sources
    #[arg(short, long, global = true)]
    input: Vec<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit the processed table
    Process {
        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// List person identifiers
    Persons {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Latest values with deltas for one person
    Latest {
        #[arg(short, long)]
        person: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// History for one person, newest first
    Series {
        #[arg(short, long)]
        person: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Full JSON report for one person
    Report {
        #[arg(short, long)]
        person: String,

        /// Pretty-print
        #[arg(long)]
        pretty: bool,
    },

    /// Diagnose configuration, source and schema
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the known source layouts
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Processed table as CSV
    Csv,
    /// JSON array of processed records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BodytrendCliError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if !cli.input.is_empty() {
        config.sources = cli.input.clone();
    }

    match cli.command {
        Commands::Process { output, format } => cmd_process(&config, &output, format),
        Commands::Persons { json } => cmd_persons(&config, json),
        Commands::Latest { person, json } => cmd_latest(&config, &person, json),
        Commands::Series { person, json } => cmd_series(&config, &person, json),
        Commands::Report { person, pretty } => cmd_report(&config, &person, pretty),
        Commands::Doctor { json } => cmd_doctor(&config, json),
        Commands::Schema { json } => cmd_schema(json),
    }
}

/// Source named by the config: stdin when the only input is "-"
fn open_source(config: &PipelineConfig) -> Result<Box<dyn TableSource>, BodytrendCliError> {
    if config.sources.is_empty() {
        return Err(BodytrendCliError::NoInput);
    }
    if config.sources.len() == 1 && config.sources[0].to_string_lossy() == "-" {
        return Ok(Box::new(CsvReaderSource::from_reader("stdin", io::stdin().lock())?));
    }
    Ok(Box::new(config.file_source()?))
}

fn load_table(config: &PipelineConfig) -> Result<ProcessedTable, BodytrendCliError> {
    let source = open_source(config)?;
    let mut processor = TrendProcessor::new(source.as_ref()).with_cache(config.cache()?);
    if let Some(mapping) = &config.schema {
        processor = processor.with_mapping(mapping.clone());
    }
    let table = processor.process()?;
    info!(
        source = %processor.source().id(),
        records = table.len(),
        persons = table.list_persons().len(),
        "processed measurement table"
    );
    Ok(table)
}

fn cmd_process(
    config: &PipelineConfig,
    output: &PathBuf,
    format: OutputFormat,
) -> Result<(), BodytrendCliError> {
    let table = load_table(config)?;

    let data = match format {
        OutputFormat::Csv => {
            let mut buffer = Vec::new();
            write_processed_csv(&table, &mut buffer)?;
            buffer
        }
        OutputFormat::Json => serde_json::to_vec(table.records())?,
        OutputFormat::JsonPretty => serde_json::to_vec_pretty(table.records())?,
    };

    if output.to_string_lossy() == "-" {
        io::stdout().write_all(&data)?;
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn cmd_persons(config: &PipelineConfig, json: bool) -> Result<(), BodytrendCliError> {
    let table = load_table(config)?;
    let persons = table.list_persons();

    if json {
        println!("{}", serde_json::to_string(&persons)?);
    } else {
        for person in persons {
            println!("{}", person);
        }
    }
    Ok(())
}

fn cmd_latest(config: &PipelineConfig, person: &str, json: bool) -> Result<(), BodytrendCliError> {
    let table = load_table(config)?;
    let latest = table.get_latest(person)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&latest)?);
        return Ok(());
    }

    println!("{} - latest data", person);
    println!("Measured: {}", latest.date_label());
    if let Some(date) = table.latest_date() {
        println!("Last update: {}", date.format("%Y/%m/%d"));
    }
    println!();
    for (metric, value) in &latest.metrics {
        let decimals = metric.display_decimals() as usize;
        let delta = if value.delta != 0.0 {
            format!(" ({:+.*}{})", decimals, value.delta, unit_suffix(*metric))
        } else {
            String::new()
        };
        println!(
            "  {:<15} {:.*}{}{}",
            metric.label(),
            decimals,
            value.value,
            unit_suffix(*metric),
            delta
        );
    }
    Ok(())
}

fn cmd_series(config: &PipelineConfig, person: &str, json: bool) -> Result<(), BodytrendCliError> {
    let table = load_table(config)?;
    let series = table.get_series(person);

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    if series.is_empty() {
        println!("No measurements for {}", person);
        return Ok(());
    }

    println!(
        "{:<12} {:>8} {:>8} {:>8} {:>8}",
        "date", "weight", "fat %", "lean", "ffmi"
    );
    for point in &series {
        println!("{}", format_series_row(point));
    }
    Ok(())
}

fn cmd_report(config: &PipelineConfig, person: &str, pretty: bool) -> Result<(), BodytrendCliError> {
    let table = load_table(config)?;
    let report = ReportEncoder::new().encode(&table, person)?;

    if pretty {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}

fn cmd_doctor(config: &PipelineConfig, json: bool) -> Result<(), BodytrendCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, BODYTREND_VERSION),
    });

    checks.push(match config.validate() {
        Ok(()) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: format!("cache ttl {}s", config.cache_ttl_secs),
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    });

    if config.sources.is_empty() {
        checks.push(DoctorCheck {
            name: "source".to_string(),
            status: CheckStatus::Warning,
            message: "No input configured".to_string(),
        });
    } else {
        for path in &config.sources {
            if path.to_string_lossy() == "-" {
                let message = if atty::is(atty::Stream::Stdin) {
                    "stdin is a TTY (no piped input)"
                } else {
                    "stdin is a pipe"
                };
                checks.push(DoctorCheck {
                    name: "source".to_string(),
                    status: CheckStatus::Ok,
                    message: message.to_string(),
                });
                continue;
            }
            let status = if path.is_file() {
                CheckStatus::Ok
            } else {
                CheckStatus::Warning
            };
            checks.push(DoctorCheck {
                name: "source".to_string(),
                status,
                message: path.display().to_string(),
            });
        }

        match open_source(config).and_then(|source| source.load().map_err(BodytrendCliError::from)) {
            Ok(raw) => {
                let resolved = match &config.schema {
                    Some(mapping) => mapping.bind(raw.headers()).map(|_| mapping.clone()),
                    None => SchemaMapping::resolve(raw.headers()),
                };
                match resolved {
                    Ok(mapping) => {
                        checks.push(DoctorCheck {
                            name: "schema".to_string(),
                            status: CheckStatus::Ok,
                            message: if mapping.has_height() {
                                "layout with height (FFMI available)".to_string()
                            } else {
                                "layout without height (no FFMI)".to_string()
                            },
                        });
                        checks.push(match bodytrend::process_table(&raw, &mapping) {
                            Ok(table) => {
                                let report = table.cleaning_report();
                                DoctorCheck {
                                    name: "cleaning".to_string(),
                                    status: if report.rows_retained == 0 && report.rows_read > 0 {
                                        CheckStatus::Warning
                                    } else {
                                        CheckStatus::Ok
                                    },
                                    message: format!(
                                        "{} of {} rows retained, {} persons",
                                        report.rows_retained,
                                        report.rows_read,
                                        table.list_persons().len()
                                    ),
                                }
                            }
                            Err(e) => DoctorCheck {
                                name: "cleaning".to_string(),
                                status: CheckStatus::Error,
                                message: e.to_string(),
                            },
                        });
                    }
                    Err(e) => checks.push(DoctorCheck {
                        name: "schema".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    }),
                }
            }
            Err(e) => checks.push(DoctorCheck {
                name: "load".to_string(),
                status: CheckStatus::Error,
                message: CliError::from(e).message,
            }),
        }
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: BODYTREND_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("bodytrend Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(BodytrendCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(json: bool) -> Result<(), BodytrendCliError> {
    let layouts = SchemaMapping::known_layouts();

    if json {
        println!("{}", serde_json::to_string_pretty(&layouts)?);
        return Ok(());
    }

    for (i, layout) in layouts.iter().enumerate() {
        println!("Layout {}:", i + 1);
        println!("  date:     {}", layout.date);
        println!("  person:   {}", layout.person);
        println!(
            "  height:   {}",
            layout.height.as_deref().unwrap_or("(none, FFMI disabled)")
        );
        println!("  weight:   {}", layout.weight);
        println!("  body fat: {}", layout.body_fat);
        println!();
    }
    println!("Dates are read from the first token of the timestamp (YYYY/MM/DD).");
    Ok(())
}

// Helper functions

fn unit_suffix(metric: Metric) -> String {
    match metric.unit() {
        "" => String::new(),
        unit => format!(" {}", unit),
    }
}

fn format_series_row(point: &SeriesPoint) -> String {
    format!(
        "{:<12} {:>8.1} {:>8.1} {:>8.1} {:>8}",
        point.date.format("%Y/%m/%d").to_string(),
        point.weight_kg,
        point.body_fat_pct,
        point.lean_body_mass_kg,
        point
            .ffmi
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "-".to_string())
    )
}

// Error types

#[derive(Debug)]
enum BodytrendCliError {
    Io(io::Error),
    Trend(TrendError),
    Json(serde_json::Error),
    NoInput,
    DoctorFailed,
}

impl From<io::Error> for BodytrendCliError {
    fn from(e: io::Error) -> Self {
        BodytrendCliError::Io(e)
    }
}

impl From<TrendError> for BodytrendCliError {
    fn from(e: TrendError) -> Self {
        BodytrendCliError::Trend(e)
    }
}

impl From<serde_json::Error> for BodytrendCliError {
    fn from(e: serde_json::Error) -> Self {
        BodytrendCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BodytrendCliError> for CliError {
    fn from(e: BodytrendCliError) -> Self {
        match e {
            BodytrendCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BodytrendCliError::Trend(e) => {
                let (code, hint) = match &e {
                    TrendError::LoadError(_) => ("LOAD_ERROR", "Check that the source CSV is reachable and readable"),
                    TrendError::SchemaError(_) => ("SCHEMA_ERROR", "Run 'bodytrend schema' to see the expected columns"),
                    TrendError::NotFound(_) => ("NOT_FOUND", "Run 'bodytrend persons' to list known persons"),
                    TrendError::ConfigError(_) => ("CONFIG_ERROR", "Fix the config file and retry"),
                    TrendError::CsvError(_) => ("CSV_ERROR", "Check CSV syntax"),
                    TrendError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    TrendError::IoError(_) => ("IO_ERROR", "Check file paths and permissions"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            BodytrendCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            BodytrendCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No input source configured".to_string(),
                hint: Some("Pass --input <file> or set 'sources' in the config".to_string()),
            },
            BodytrendCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
