//! Ratioscan CLI
//!
//! Batch analyzer for cross-exchange price-ratio mean reversion over a
//! captured tick store.
//!
//! # Usage
//!
//! ```bash
//! # Analyze all available data
//! ratioscan --data-path ./data/market_data
//!
//! # Analyze a specific date range with more workers
//! ratioscan --start-date 2025-11-01 --end-date 2025-11-03 --workers 16
//!
//! # Restrict to specific venues, write the JSON artifact too
//! ratioscan --exchanges Binance Bybit OKX --json
//! ```

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use ratioscan::batch::{BatchOrchestrator, RunParams};
use ratioscan::config::AnalyzerConfig;
use ratioscan::data::{apply_exchange_filter, discover_symbols};
use ratioscan::report;

#[derive(Parser, Debug)]
#[command(name = "ratioscan")]
#[command(about = "Cross-exchange price-ratio mean-reversion analyzer")]
struct Args {
    /// Config file path (default: ratioscan.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root of the partitioned tick store (overrides config)
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Directory for summary reports (overrides config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Exchanges to analyze (e.g. --exchanges Binance Bybit OKX)
    #[arg(long, num_args = 1..)]
    exchanges: Option<Vec<String>>,

    /// Number of parallel workers (default: 3x CPU cores)
    #[arg(long)]
    workers: Option<usize>,

    /// Analysis thresholds in percent (exactly three)
    #[arg(long, num_args = 3)]
    thresholds: Option<Vec<f64>>,

    /// Neutral-zone threshold in percent
    #[arg(long)]
    zero_threshold: Option<f64>,

    /// Analyze one date (YYYY-MM-DD); shortcut for --start-date D --end-date D
    #[arg(long, conflicts_with_all = ["start_date", "end_date", "today"])]
    date: Option<String>,

    /// Inclusive start date (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<String>,

    /// Inclusive end date (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<String>,

    /// Analyze only today's data
    #[arg(long, conflicts_with_all = ["start_date", "end_date"])]
    today: bool,

    /// Also write the structured JSON results artifact
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ratioscan=info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = AnalyzerConfig::load_or_default(args.config.as_deref())?;

    // CLI overrides config.
    if let Some(data_path) = args.data_path {
        config.paths.data_directory = data_path;
    }
    if let Some(output_dir) = args.output_dir {
        config.paths.output_directory = output_dir;
    }
    if let Some(exchanges) = args.exchanges {
        config.filters.exchanges = Some(exchanges);
    }
    if let Some(workers) = args.workers {
        config.performance.workers = Some(workers);
    }
    if let Some(thresholds) = args.thresholds {
        // clap enforces num_args = 3.
        config.analysis.thresholds = [thresholds[0], thresholds[1], thresholds[2]];
    }
    if let Some(zero_threshold) = args.zero_threshold {
        config.analysis.zero_threshold = zero_threshold;
    }
    if args.today {
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        info!(">>> Using --today: {today} <<<");
        config.date_range.start_date = Some(today.clone());
        config.date_range.end_date = Some(today);
    } else if let Some(date) = args.date {
        config.date_range.start_date = Some(date.clone());
        config.date_range.end_date = Some(date);
    } else {
        if args.start_date.is_some() {
            config.date_range.start_date = args.start_date;
        }
        if args.end_date.is_some() {
            config.date_range.end_date = args.end_date;
        }
    }
    config.validate()?;

    let start_date = parse_date(config.date_range.start_date.as_deref(), "start date")?;
    let end_date = parse_date(config.date_range.end_date.as_deref(), "end date")?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            bail!("start date {start} is after end date {end}");
        }
    }

    match (start_date, end_date) {
        (Some(start), Some(end)) => info!("filtering data: {start} to {end}"),
        (Some(start), None) => info!("filtering data: from {start} onwards"),
        (None, Some(end)) => info!("filtering data: up to {end}"),
        (None, None) => info!("analyzing all available data"),
    }

    // Discover pairable symbols, then apply the venue filter if configured.
    let mut symbols = discover_symbols(&config.paths.data_directory)?;
    if let Some(exchanges) = &config.filters.exchanges {
        info!(exchanges = ?exchanges, "filtering for exchanges");
        symbols = apply_exchange_filter(symbols, exchanges);
    }
    if symbols.is_empty() {
        info!("no symbols found trading on 2 or more exchanges; nothing to analyze");
        return Ok(());
    }
    for (symbol, venues) in symbols.iter().take(5) {
        info!(%symbol, venues = ?venues, "discovered");
    }

    let orchestrator = BatchOrchestrator::new(RunParams {
        data_root: config.paths.data_directory.clone(),
        start_date,
        end_date,
        thresholds: config.analysis.thresholds,
        zero_threshold: config.analysis.zero_threshold,
        workers: config.performance.workers,
    });
    let summary = orchestrator.run(symbols)?;

    let ranked = ratioscan::batch::rank_by_reversion_frequency(&summary.outcomes);
    if ranked.is_empty() {
        info!("no pair produced metrics; skipping report files");
    } else {
        let csv_path = report::write_csv_report(
            &config.paths.output_directory,
            &ranked,
            &config.analysis.thresholds,
        )?;
        info!(path = %csv_path.display(), "summary statistics saved");
        if args.json {
            let json_path =
                report::write_json_report(&config.paths.output_directory, &summary)?;
            info!(path = %json_path.display(), "results artifact saved");
        }
    }

    report::print_top_tables(&summary);
    report::print_totals(&summary);

    Ok(())
}

fn parse_date(value: Option<&str>, what: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("invalid {what}: expected YYYY-MM-DD, got {raw}"))
        })
        .transpose()
}
