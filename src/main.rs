// Entry point and command-line flow.
//
// - `check` loads the delivery report and prints load diagnostics.
// - `report` runs the audit, prints markdown previews of each result set and
//   exports them as CSV files plus a JSON summary.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use courier_audit::config::{AuditConfig, MatchMode};
use courier_audit::loader::{self, LoadReport};
use courier_audit::types::ShipmentRecord;
use courier_audit::util::{format_int, format_number};
use courier_audit::{output, reports};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Courier delivery audit reports", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the delivery report and print diagnostics
    Check {
        /// Delivery report (CSV, 17 columns A..Q, header in row 1)
        input: PathBuf,
    },
    /// Generate all audit reports
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Delivery report (CSV, 17 columns A..Q, header in row 1)
    input: PathBuf,

    /// Directory the report files are written to
    #[arg(short, long, default_value = "reports")]
    out: PathBuf,

    /// Success keyword; repeat to give several. Replaces the configured set.
    #[arg(short, long = "keyword")]
    keywords: Vec<String>,

    /// Require the whole status text to equal a keyword
    #[arg(long)]
    exact: bool,

    /// Print previews only, write no files
    #[arg(long)]
    no_export: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AuditConfig::from_path(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => AuditConfig::default(),
    };

    match cli.command {
        Command::Check { input } => {
            let (_, load_report) = load(&input, &config)?;
            print_load_report(&load_report);
            Ok(())
        }
        Command::Report(args) => {
            if !args.keywords.is_empty() {
                config.success.keywords = args.keywords.clone();
            }
            if args.exact {
                config.success.mode = MatchMode::Exact;
            }
            if config.success.matcher().keywords().is_empty() {
                warn!("no success keywords configured; every courier will report 0% effectiveness");
            }
            let (data, load_report) = load(&args.input, &config)?;
            print_load_report(&load_report);
            generate_reports(&data, &config, &args)
        }
    }
}

fn load(input: &Path, config: &AuditConfig) -> Result<(Vec<ShipmentRecord>, LoadReport)> {
    let delimiter = config.input.delimiter_byte()?;
    loader::load_from_path(input, &config.columns, delimiter)
        .with_context(|| format!("failed to load {}", input.display()))
}

fn print_load_report(load_report: &LoadReport) {
    println!(
        "Processing dataset... ({} rows loaded, header row discarded)",
        format_int(load_report.data_rows)
    );
    if load_report.blank_couriers > 0 {
        println!(
            "Note: {} rows have no courier.",
            format_int(load_report.blank_couriers)
        );
    }
    if load_report.blank_postal_codes > 0 {
        println!(
            "Note: {} rows have no postal code.",
            format_int(load_report.blank_postal_codes)
        );
    }
    if load_report.blank_rows > 0 {
        println!(
            "Note: {} empty rows skipped.",
            format_int(load_report.blank_rows)
        );
    }
    if load_report.lossy_rows > 0 {
        println!(
            "Note: {} rows contained invalid UTF-8; unreadable characters were replaced.",
            format_int(load_report.lossy_rows)
        );
    }
    println!();
}

fn generate_reports(data: &[ShipmentRecord], config: &AuditConfig, args: &ReportArgs) -> Result<()> {
    let report = reports::run_audit(data, config).context("audit failed")?;
    let limits = &config.limits;

    let most_note = format!("Top {} couriers by successful deliveries", limits.ranking_size);
    let fewest_note = format!("Bottom {} couriers by successful deliveries", limits.ranking_size);
    let hub_note = format!(
        "Highest-volume code per 3-digit prefix among the top {}",
        limits.hub_pool
    );
    let incident_note = format!("Top {} (courier, reason) pairs", limits.incidents_top);

    output::preview_table(
        "Report 1: Courier Effectiveness",
        Some("Sorted by effectiveness"),
        &report.couriers,
        limits.preview_rows,
    );
    output::preview_table(
        "Report 2: Most Deliveries",
        Some(most_note.as_str()),
        &report.ranking.most,
        limits.ranking_size,
    );
    output::preview_table(
        "Report 3: Fewest Deliveries",
        Some(fewest_note.as_str()),
        &report.ranking.fewest,
        limits.ranking_size,
    );
    output::preview_table(
        "Report 4: Postal Code Distribution",
        Some("Shipments and dominant product per postal code"),
        &report.postal_profile,
        limits.preview_rows,
    );
    output::preview_table(
        "Report 5: Micro-Hub Candidates",
        Some(hub_note.as_str()),
        &report.micro_hubs,
        report.micro_hubs.len(),
    );
    output::preview_table(
        "Report 6: Incidents by Courier",
        Some(incident_note.as_str()),
        &report.incidents,
        limits.incidents_top,
    );

    println!("Summary Stats:");
    println!(
        "{{\"total_shipments\": {}, \"couriers\": {}, \"overall_effectiveness\": {}}}\n",
        format_int(report.summary.total_shipments),
        format_int(report.summary.total_couriers),
        format_number(report.summary.overall_effectiveness, 2)
    );

    if args.no_export {
        info!("export skipped");
        return Ok(());
    }
    let written = output::export_report(&args.out, &report)
        .with_context(|| format!("failed to write reports to {}", args.out.display()))?;
    for path in written {
        println!("(Exported {})", path.display());
    }
    Ok(())
}
