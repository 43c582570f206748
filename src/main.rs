use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ledger_tools::model::InvoiceQuery;
use ledger_tools::{DataSession, Result, logging};
use serde::Serialize;

fn main() {
    if let Err(error) = logging::init() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut session = DataSession::new();
    session.set_source(&cli.source)?;

    match cli.command {
        Command::Schema(args) => {
            if !args.set.is_empty() {
                session.override_schema(&args.set)?;
            }
            print_json(&session.schema_report()?)
        }
        Command::Months { limit } => print_json(&session.list_months(limit)?),
        Command::Invoices(args) => {
            let request = InvoiceQuery {
                date_range: args.date_range,
                customer: args.customer,
                include_returns: !args.exclude_returns,
                max_results: args.max_results,
            };
            print_json(&session.invoices(&request)?)
        }
        Command::Lines { invoice_id } => print_json(&session.invoice_lines(&invoice_id)?),
        Command::Summary(args) => print_json(&session.summarize_month(
            &args.month,
            !args.exclude_returns,
            args.top_clients,
        )?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parses a `ROLE=COLUMN` override; `ROLE=` unsets the role.
fn parse_assignment(raw: &str) -> std::result::Result<(String, Option<String>), String> {
    match raw.split_once('=') {
        Some((role, "")) => Ok((role.to_string(), None)),
        Some((role, column)) => Ok((role.to_string(), Some(column.to_string()))),
        None => Err(format!("expected ROLE=COLUMN, got '{raw}'")),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Query loosely-structured sales spreadsheets without knowing their layout."
)]
struct Cli {
    /// Path to the spreadsheet (.xlsx/.xls) or CSV data source.
    #[arg(long)]
    source: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the detected schema, optionally applying overrides first.
    Schema(SchemaArgs),
    /// List distinct YYYY-MM months present in the date column, newest first.
    Months {
        #[arg(long, default_value_t = 24)]
        limit: usize,
    },
    /// Aggregate line records into invoice-level summaries.
    Invoices(InvoiceArgs),
    /// Show the detail lines of one invoice.
    Lines { invoice_id: String },
    /// Summarize revenue and top customers for one month.
    Summary(SummaryArgs),
}

#[derive(Args)]
struct SchemaArgs {
    /// Manual role override as ROLE=COLUMN; repeatable; ROLE= unsets.
    #[arg(long = "set", value_parser = parse_assignment)]
    set: Vec<(String, Option<String>)>,
}

#[derive(Args)]
struct InvoiceArgs {
    /// Month window: YYYY-MM or YYYY-MM..YYYY-MM, inclusive.
    #[arg(long)]
    date_range: Option<String>,

    /// Keep only rows whose customer value equals this text.
    #[arg(long)]
    customer: Option<String>,

    /// Exclude negative-quantity rows (returns).
    #[arg(long)]
    exclude_returns: bool,

    #[arg(long, default_value_t = 200)]
    max_results: usize,
}

#[derive(Args)]
struct SummaryArgs {
    /// Month to summarize, as YYYY-MM.
    month: String,

    /// Exclude negative-quantity rows (returns).
    #[arg(long)]
    exclude_returns: bool,

    /// How many top customers to rank.
    #[arg(long, default_value_t = 5)]
    top_clients: usize,
}
