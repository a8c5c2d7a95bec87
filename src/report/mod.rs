//! Summary reporting: CSV and JSON persistence plus console tables.
//!
//! The CSV is the consumer-facing artifact: one row per successful pair,
//! pre-sorted by the primary ranking metric, with per-threshold column
//! groups labeled in the basis-point style of the historical reports
//! (`030bp`, `050bp`, `040bp` for the defaults). The JSON artifact carries
//! the full structured outcome set including skip/error statuses.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::batch::orchestrator::BatchSummary;
use crate::batch::ranking::{
    rank_by_cycle_density, rank_by_reversion_frequency, CYCLE_RANK_THRESHOLD,
};
use crate::batch::PairOutcome;

/// Column label for a percent threshold: 0.3 -> "030bp".
fn threshold_label(threshold_pct: f64) -> String {
    format!("{:03}bp", (threshold_pct * 100.0).round() as i64)
}

/// Write the ranked CSV report. Returns the path written.
///
/// `ranked` must already be ordered by the primary ranking; only rows with
/// metrics are written.
pub fn write_csv_report(
    output_dir: &Path,
    ranked: &[&PairOutcome],
    thresholds: &[f64; 3],
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let path = output_dir.join(format!(
        "summary_stats_{}.csv",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("failed to create report: {}", path.display()))?;

    // Strictly defined column order.
    let mut header: Vec<String> = [
        "symbol",
        "exchange1",
        "exchange2",
        "max_deviation_pct",
        "min_deviation_pct",
        "deviation_asymmetry",
        "zero_crossings",
        "zero_crossings_per_hour",
        "zero_crossings_per_minute",
    ]
    .map(String::from)
    .to_vec();
    for &threshold in thresholds {
        let label = threshold_label(threshold);
        header.push(format!("opportunity_cycles_{label}"));
        header.push(format!("cycles_{label}_per_hour"));
        header.push(format!("pct_time_above_{label}"));
        header.push(format!("avg_cycle_duration_{label}_sec"));
        header.push(format!("pattern_break_{label}"));
    }
    header.push("data_points".to_string());
    header.push("duration_hours".to_string());
    writer.write_record(&header)?;

    for outcome in ranked {
        let Some(metrics) = &outcome.metrics else {
            continue;
        };
        let mut row: Vec<String> = vec![
            outcome.symbol.clone(),
            outcome.exchange1.clone(),
            outcome.exchange2.clone(),
            metrics.max_deviation_pct.to_string(),
            metrics.min_deviation_pct.to_string(),
            metrics.deviation_asymmetry.to_string(),
            metrics.zero_crossings.to_string(),
            metrics.zero_crossings_per_hour.to_string(),
            metrics.zero_crossings_per_minute.to_string(),
        ];
        for t in &metrics.thresholds {
            row.push(t.complete_cycles.to_string());
            row.push(t.cycles_per_hour.to_string());
            row.push(t.pct_time_above.to_string());
            row.push(t.avg_cycle_duration_sec.to_string());
            row.push(t.pattern_break.to_string());
        }
        row.push(metrics.data_points.to_string());
        row.push(metrics.duration_hours.to_string());
        writer.write_record(&row)?;
    }

    writer.flush().context("failed to flush report")?;
    Ok(path)
}

/// Write the structured JSON artifact (full outcome set with statuses).
pub fn write_json_report(output_dir: &Path, summary: &BatchSummary) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let path = output_dir.join(format!(
        "summary_stats_{}.json",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));

    let file = File::create(&path)
        .with_context(|| format!("failed to create report: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .context("failed to serialize results")?;
    Ok(path)
}

/// Print the two top-10 tables: reversion frequency and cycle density.
pub fn print_top_tables(summary: &BatchSummary) {
    let by_frequency = rank_by_reversion_frequency(&summary.outcomes);
    if by_frequency.is_empty() {
        return;
    }

    println!();
    println!("  Top 10 pairs by mean-reversion frequency (zero crossings/min):");
    print_table_header();
    for outcome in by_frequency.iter().take(10) {
        print_table_row(outcome);
    }

    println!();
    println!("  Top 10 pairs by complete cycles (most tradeable opportunities):");
    print_table_header();
    for outcome in rank_by_cycle_density(&summary.outcomes).iter().take(10) {
        print_table_row(outcome);
    }
}

fn print_table_header() {
    println!(
        "  {:<12} {:<10} {:<10} {:>8} {:>7} {:>8} {:>7}",
        "Symbol", "Ex1", "Ex2", "ZC/min", "Cycles", "Cyc/hr", "Asymm"
    );
    println!("  {}", "-".repeat(68));
}

fn print_table_row(outcome: &PairOutcome) {
    let Some(metrics) = &outcome.metrics else {
        return;
    };
    let mid = metrics.thresholds.get(CYCLE_RANK_THRESHOLD);
    println!(
        "  {:<12} {:<10} {:<10} {:>8.2} {:>7} {:>8.1} {:>7.2}",
        outcome.symbol,
        outcome.exchange1,
        outcome.exchange2,
        metrics.zero_crossings_per_minute,
        mid.map(|t| t.complete_cycles).unwrap_or(0),
        mid.map(|t| t.cycles_per_hour).unwrap_or(0.0),
        metrics.deviation_asymmetry.abs(),
    );
}

/// Final totals, printed even when everything failed or was skipped.
pub fn print_totals(summary: &BatchSummary) {
    println!();
    println!("--- Analysis Finished ---");
    println!("Total pairs: {}", summary.total_pairs);
    println!("[OK] Successful: {}", summary.successful);
    println!("[ -] Skipped (no data): {}", summary.skipped);
    println!("[!!] Errors: {}", summary.errors);
}
