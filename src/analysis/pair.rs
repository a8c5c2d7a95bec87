//! Per-pair metric assembly.
//!
//! Composes synchronization, deviation computation, and cycle scanning into
//! the full metric record for one (symbol, exchange1, exchange2) triple, and
//! owns the numeric edge-case policy: empty overlap and zero duration are
//! ordinary outcomes, and any unexpected numeric failure is contained at the
//! pair boundary so one bad pair cannot abort a batch.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::cycles::{count_complete_cycles, pattern_break, zero_crossings};
use crate::analysis::deviation::{deviation_series, deviation_stats};
use crate::analysis::sync::synchronize;
use crate::models::{TickSeries, NANOS_PER_HOUR};

/// Per-threshold slice of the pair metrics. One structured sub-record per
/// configured threshold, in configuration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStats {
    /// The threshold this sub-record was scanned at, in percent.
    pub threshold_pct: f64,
    /// Completed above-threshold -> back-to-neutral round trips.
    pub complete_cycles: u64,
    pub cycles_per_hour: f64,
    /// Percent of defined rows with |deviation| above the threshold.
    pub pct_time_above: f64,
    /// Approximate mean seconds spent above threshold per completed cycle,
    /// derived from the time-above fraction; zero when no cycle completed.
    pub avg_cycle_duration_sec: f64,
    /// Series ended outside this threshold: the last excursion is unresolved.
    pub pattern_break: bool,
}

/// Full metric record for one analyzed exchange pair. Immutable once
/// produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairMetrics {
    pub max_deviation_pct: f64,
    pub min_deviation_pct: f64,
    /// Mean deviation from parity; directional-bias indicator.
    pub deviation_asymmetry: f64,
    pub zero_crossings: u64,
    pub zero_crossings_per_hour: f64,
    pub zero_crossings_per_minute: f64,
    pub thresholds: Vec<ThresholdStats>,
    /// Synchronized rows analyzed (including rows excluded from aggregates).
    pub data_points: usize,
    pub duration_hours: f64,
}

/// Analyze one exchange pair for a symbol.
///
/// Returns `None` both for "insufficient overlapping data" and for any
/// unexpected numeric failure; the latter is logged with pair context. Never
/// returns an error and never panics on malformed input.
pub fn analyze_pair(
    symbol: &str,
    ex1: &str,
    ex2: &str,
    series1: &TickSeries,
    series2: &TickSeries,
    thresholds: &[f64; 3],
    zero_threshold: f64,
) -> Option<PairMetrics> {
    match try_analyze_pair(series1, series2, thresholds, zero_threshold) {
        Ok(metrics) => metrics,
        Err(error) => {
            warn!(symbol, ex1, ex2, %error, "pair analysis failed");
            None
        }
    }
}

/// Fallible variant for callers that track skip and failure separately.
///
/// `Ok(None)` means no overlapping usable data (a skip, not a failure);
/// `Err` is reserved for inputs that violate the loader contract.
pub fn try_analyze_pair(
    series1: &TickSeries,
    series2: &TickSeries,
    thresholds: &[f64; 3],
    zero_threshold: f64,
) -> Result<Option<PairMetrics>> {
    let synced = synchronize(series1, series2);
    if synced.is_empty() {
        return Ok(None);
    }

    let deviation = deviation_series(&synced);
    let Some(stats) = deviation_stats(&deviation) else {
        return Ok(None);
    };
    if !stats.max_pct.is_finite() || !stats.min_pct.is_finite() || !stats.asymmetry.is_finite() {
        bail!("non-finite deviation aggregate (malformed input series)");
    }

    // Anchor order is preserved by the join, so the range is first..last.
    let duration_ns = synced[synced.len() - 1].timestamp - synced[0].timestamp;
    let duration_hours = duration_ns as f64 / NANOS_PER_HOUR as f64;

    let crossings = zero_crossings(&deviation);
    let zero_crossings_per_hour = if duration_hours > 0.0 {
        crossings as f64 / duration_hours
    } else {
        0.0
    };
    let zero_crossings_per_minute = zero_crossings_per_hour / 60.0;

    let neutral: Vec<bool> = deviation
        .iter()
        .map(|d| d.map(|v| v.abs() < zero_threshold).unwrap_or(false))
        .collect();

    let threshold_stats = thresholds
        .iter()
        .map(|&threshold_pct| {
            let above: Vec<bool> = deviation
                .iter()
                .map(|d| d.map(|v| v.abs() > threshold_pct).unwrap_or(false))
                .collect();

            let complete_cycles = count_complete_cycles(&above, &neutral);
            let rows_above = above.iter().filter(|&&a| a).count();
            let pct_time_above = 100.0 * rows_above as f64 / stats.defined_rows as f64;
            let cycles_per_hour = if duration_hours > 0.0 {
                complete_cycles as f64 / duration_hours
            } else {
                0.0
            };
            // Time-above spread evenly over the completed cycles. An
            // approximation: diverges from true per-cycle elapsed time when
            // cycle lengths are highly uneven.
            let avg_cycle_duration_sec = if complete_cycles > 0 {
                (duration_hours * pct_time_above / 100.0 * 3600.0) / complete_cycles as f64
            } else {
                0.0
            };

            ThresholdStats {
                threshold_pct,
                complete_cycles,
                cycles_per_hour,
                pct_time_above,
                avg_cycle_duration_sec,
                pattern_break: pattern_break(&deviation, threshold_pct),
            }
        })
        .collect();

    Ok(Some(PairMetrics {
        max_deviation_pct: stats.max_pct,
        min_deviation_pct: stats.min_pct,
        deviation_asymmetry: stats.asymmetry,
        zero_crossings: crossings,
        zero_crossings_per_hour,
        zero_crossings_per_minute,
        thresholds: threshold_stats,
        data_points: synced.len(),
        duration_hours,
    }))
}
