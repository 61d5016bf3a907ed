use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use indicatif::{ProgressBar, ProgressStyle};
use papersurf::config::{find_config_file, get_config, load_config};
use papersurf::models::{ReportRow, SearchQuery, REPORT_COLUMNS};
use papersurf::pipeline::{Pipeline, ReportOutcome};
use papersurf::sources::SourceRegistry;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// papersurf - search academic databases and report every hit with its DOI
#[derive(Parser, Debug)]
#[command(name = "papersurf")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Federated literature search with DOI resolution", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for the report
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table if stdout is a terminal, CSV otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// CSV format (machine-readable)
    Csv,
}

/// Database backends selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Database {
    #[value(name = "arxiv")]
    Arxiv,
    #[value(name = "biorxiv")]
    Biorxiv,
    #[value(name = "pubmed")]
    Pubmed,
}

impl Database {
    fn id(self) -> &'static str {
        match self {
            Database::Arxiv => "arxiv",
            Database::Biorxiv => "biorxiv",
            Database::Pubmed => "pubmed",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for articles and emit the resolved report
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Number of days to look back from today
        #[arg(long, short, default_value_t = 1)]
        since: i64,

        /// Global cap on merged results
        #[arg(long)]
        limit: Option<usize>,

        /// Cap on results per individual database
        #[arg(long)]
        limit_per_database: Option<usize>,

        /// Databases to search (default: all configured)
        #[arg(long, short, value_enum)]
        database: Vec<Database>,
    },

    /// List the available database backends
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("papersurf={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = if let Some(config_path) = &cli.config {
        load_config(config_path)?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("using config file: {}", config_path.display());
        load_config(&config_path)?
    } else {
        get_config()
    };

    match cli.command {
        Commands::Search {
            query,
            since,
            limit,
            limit_per_database,
            database,
        } => {
            let today = chrono::Local::now().date_naive();
            let mut search_query = SearchQuery::lookback(query, today, since)
                .limit(limit.unwrap_or(config.search.limit))
                .limit_per_database(
                    limit_per_database.unwrap_or(config.search.limit_per_database),
                );
            search_query = if database.is_empty() {
                search_query.databases(config.search.databases.clone())
            } else {
                search_query.databases(database.iter().map(|d| d.id().to_string()).collect())
            };

            let mut pipeline = Pipeline::new(&config)?;
            if std::io::stderr().is_terminal() && !cli.quiet {
                let bar = ProgressBar::new(0).with_style(
                    ProgressStyle::with_template("{msg} {bar:40} {pos}/{len}")
                        .expect("valid progress template"),
                );
                bar.set_message("resolving");
                pipeline = pipeline.with_progress(bar);
            }

            match pipeline.run(&search_query).await {
                Ok(ReportOutcome::EmptyQuery) => {
                    eprintln!("Query is empty! Don't know what to search for.");
                }
                Ok(ReportOutcome::Report(rows)) if rows.is_empty() => {
                    eprintln!("No articles found for this query and window.");
                }
                Ok(ReportOutcome::Report(rows)) => {
                    output_report(&rows, cli.output)?;
                }
                Err(error) => {
                    // the cause stays in the logs, the user gets a generic notice
                    tracing::error!("report generation failed: {}", error);
                    eprintln!("Something went wrong while generating the report.");
                    std::process::exit(1);
                }
            }
        }

        Commands::Sources => {
            let registry = SourceRegistry::new()?;
            let mut ids: Vec<&str> = registry.ids().collect();
            ids.sort_unstable();
            for id in ids {
                let source = registry.get_required(id)?;
                println!("{:<10} {}", source.id(), source.name());
            }
        }
    }

    Ok(())
}

fn output_report(rows: &[ReportRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Auto => {
            if std::io::stdout().is_terminal() {
                print_table(rows);
            } else {
                print_csv(rows)?;
            }
        }
        OutputFormat::Table => print_table(rows),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Csv => print_csv(rows)?,
    }
    Ok(())
}

fn print_table(rows: &[ReportRow]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(REPORT_COLUMNS);
    for row in rows {
        table.add_row(row.values());
    }
    println!("{}", table);
}

fn print_csv(rows: &[ReportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record(REPORT_COLUMNS)?;
    for row in rows {
        writer.write_record(row.values())?;
    }
    writer.flush()?;
    Ok(())
}
