//! SSEMR reports command-line interface

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use ssemr_reports::cli::config::{ConfigOverrides, RunConfig};
use ssemr_reports::cli::output::{self, ColorMode, OutputFormat};
use ssemr_reports::cli::{evaluate, evaluation_context, list, report};
use ssemr_reports::types::parse_date;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SSEMR reports tool
#[derive(Parser)]
#[command(name = "ssemr-reports")]
#[command(author, version, about = "Evaluate SSEMR person data definitions and reports", long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "pretty", global = true)]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    color: ColorMode,

    /// Run config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Warehouse database file
    #[arg(long, global = true)]
    warehouse: Option<PathBuf>,

    /// Database file attached under the schema name
    #[arg(long, global = true)]
    attach: Option<PathBuf>,

    /// Warehouse schema
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Template directory
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Reporting period and cohort
#[derive(Args)]
struct PeriodArgs {
    /// Period start (YYYY-MM-DD or dd-mm-yyyy)
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,

    /// Period end, inclusive
    #[arg(long, value_parser = parse_date)]
    end: NaiveDate,

    /// Restrict to these person ids
    #[arg(long, value_delimiter = ',')]
    cohort: Vec<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List definitions and reports
    List,

    /// Evaluate one person data definition
    Evaluate {
        /// Definition id or name
        definition: String,

        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Evaluate every dataset of a report
    Report {
        /// Report name or uuid
        report: String,

        #[command(flatten)]
        period: PeriodArgs,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let overrides = ConfigOverrides {
        warehouse: cli.warehouse,
        attach: cli.attach,
        schema: cli.schema,
        templates: cli.templates,
    };
    let config = RunConfig::resolve(cli.config.as_deref(), overrides)?;
    let manager = config.report_manager()?;
    let output_file = cli.output.as_deref();

    match cli.command {
        Commands::List => output::print_output(&list::list(&manager), cli.format, output_file),
        Commands::Evaluate { definition, period } => {
            let ctx = evaluation_context(period.start, period.end, &period.cohort, config.cohort.as_deref())?;
            let result = evaluate::evaluate(manager.persons(), &definition, &ctx)?;
            output::print_output(&*result, cli.format, output_file)
        }
        Commands::Report { report: key, period } => {
            let ctx = evaluation_context(period.start, period.end, &period.cohort, config.cohort.as_deref())?;
            let data = report::report(&manager, &key, &ctx)?;
            output::print_output(&data, cli.format, output_file)
        }
    }
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    output::setup_colors(cli.color);
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
