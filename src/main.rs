//! case-status main entry point
//!
//! This is the command-line interface for looking up Delhi High Court case
//! status and reviewing the query audit log.

use anyhow::Context;
use case_status::audit::{open_sink, AuditSink};
use case_status::config::load_config_with_hash;
use case_status::{CaseQuery, CaseRecord, CaseSearcher, Config, SearchError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// case-status: Delhi High Court case-status lookup
///
/// Searches the court portal by case type, number and filing year, and lists
/// the case's parties, dates and order/judgment documents. Every query is
/// recorded in an append-only audit log.
#[derive(Parser, Debug)]
#[command(name = "case-status")]
#[command(version)]
#[command(about = "Delhi High Court case-status lookup", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", default_value = "case-status.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up a case
    Search {
        /// Case type as listed on the portal, e.g. "W.P.(C)"
        case_type: String,

        /// Case number
        case_number: String,

        /// Filing year
        year: u16,

        /// Return every matching row instead of the first
        #[arg(long)]
        all: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the case types the portal offers
    CaseTypes,

    /// Show the most recent audit log entries
    History {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    match cli.command {
        Command::Search {
            case_type,
            case_number,
            year,
            all,
            json,
        } => handle_search(&config, case_type, case_number, year, all, json).await,
        Command::CaseTypes => handle_case_types(&config).await,
        Command::History { limit } => handle_history(&config, limit).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("case_status=info,warn"),
            1 => EnvFilter::new("case_status=debug,info"),
            2 => EnvFilter::new("case_status=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles `search`: runs the query and prints the record(s)
async fn handle_search(
    config: &Config,
    case_type: String,
    case_number: String,
    year: u16,
    all: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    // Left unvalidated so the searcher audits rejected input too
    let query = CaseQuery {
        case_type: case_type.trim().to_string(),
        case_number: case_number.trim().to_string(),
        filing_year: year,
    };

    let searcher = CaseSearcher::from_config(config).context("failed to open audit log")?;

    let outcome = if all {
        searcher.search_all(query).await
    } else {
        searcher.search(query).await.map(|record| vec![record])
    };
    searcher.flush_audit().await;

    let records = match outcome {
        Ok(records) => records,
        Err(e) => return Ok(report_failure(&e)),
    };

    if json {
        let rendered = if all {
            serde_json::to_string_pretty(&records)?
        } else {
            serde_json::to_string_pretty(&records[0])?
        };
        println!("{}", rendered);
    } else {
        for (index, record) in records.iter().enumerate() {
            if index > 0 {
                println!();
            }
            print_record(record);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Handles `case-types`: prints one case type per line
async fn handle_case_types(config: &Config) -> anyhow::Result<ExitCode> {
    let searcher = CaseSearcher::from_config(config).context("failed to open audit log")?;

    match searcher.list_case_types().await {
        Ok(types) => {
            for case_type in types {
                println!("{}", case_type);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_failure(&e)),
    }
}

/// Handles `history`: prints recent audit entries
async fn handle_history(config: &Config, limit: usize) -> anyhow::Result<ExitCode> {
    println!("Audit log: {}\n", config.audit.backend());

    let sink = open_sink(&config.audit).context("failed to open audit log")?;
    let entries = tokio::task::spawn_blocking(move || sink.recent(limit))
        .await?
        .context("failed to read audit log")?;

    if entries.is_empty() {
        println!("No queries recorded yet");
        return Ok(ExitCode::SUCCESS);
    }

    for entry in entries {
        println!(
            "#{:<6} {}  {:<9}  {} {}/{}  html={}B",
            entry.id,
            entry.created_at,
            entry.status.to_db_string(),
            entry.case_type,
            entry.case_number,
            entry.filing_year,
            entry.raw_html.as_ref().map_or(0, String::len)
        );
        if let Some(detail) = entry.error_detail {
            println!("        {}", detail);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_record(record: &CaseRecord) {
    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    println!("Query:         {}", record.query);
    println!("Case:          {}", or_dash(record.case_number_text.clone()));
    println!("Parties:       {}", or_dash(record.parties.clone()));
    println!(
        "Filing date:   {}",
        or_dash(record.filing_date.as_ref().map(ToString::to_string))
    );
    println!(
        "Next hearing:  {}",
        or_dash(record.next_hearing_date.as_ref().map(ToString::to_string))
    );
    println!("Court:         {}", or_dash(record.court_number.clone()));

    println!("\nOrders ({}):", record.order_links.len());
    for link in &record.order_links {
        println!(
            "  [p{}] {:<12} {}  {}",
            link.page_index,
            link.order_date.as_deref().unwrap_or("-"),
            link.label,
            link.document_url
        );
    }

    for warning in &record.warnings {
        println!("\nWarning: {}", warning);
    }
}

/// Prints the user-facing message and returns the failure exit code
fn report_failure(error: &SearchError) -> ExitCode {
    eprintln!("{}", error.user_message());
    ExitCode::FAILURE
}
