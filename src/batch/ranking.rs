//! Post-run ranking of pair outcomes.
//!
//! Pure post-passes over the fully accumulated result set, so out-of-order
//! task completion never affects what gets reported. Both rankings are
//! descending stable sorts: ties keep their accumulation order.

use crate::batch::orchestrator::{PairOutcome, PairStatus};

/// Threshold index used for the cycle-density ranking: the third configured
/// threshold, which is the median (0.40) of the default triple.
pub const CYCLE_RANK_THRESHOLD: usize = 2;

fn successful(outcomes: &[PairOutcome]) -> Vec<&PairOutcome> {
    outcomes
        .iter()
        .filter(|o| o.status == PairStatus::Success && o.metrics.is_some())
        .collect()
}

/// Primary ranking: zero crossings per minute, the mean-reversion frequency
/// signal. The persisted CSV is ordered by this.
pub fn rank_by_reversion_frequency(outcomes: &[PairOutcome]) -> Vec<&PairOutcome> {
    let mut ranked = successful(outcomes);
    ranked.sort_by(|a, b| {
        let a = a.metrics.as_ref().map(|m| m.zero_crossings_per_minute).unwrap_or(0.0);
        let b = b.metrics.as_ref().map(|m| m.zero_crossings_per_minute).unwrap_or(0.0);
        b.total_cmp(&a)
    });
    ranked
}

/// Secondary ranking: complete cycles at the middle threshold, the
/// tradeable-opportunity density signal.
pub fn rank_by_cycle_density(outcomes: &[PairOutcome]) -> Vec<&PairOutcome> {
    let mut ranked = successful(outcomes);
    ranked.sort_by_key(|o| {
        let cycles = o
            .metrics
            .as_ref()
            .and_then(|m| m.thresholds.get(CYCLE_RANK_THRESHOLD))
            .map(|t| t.complete_cycles)
            .unwrap_or(0);
        std::cmp::Reverse(cycles)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pair::{PairMetrics, ThresholdStats};

    fn outcome(symbol: &str, zc_per_min: f64, cycles_mid: u64) -> PairOutcome {
        let threshold_stats = |cycles| ThresholdStats {
            threshold_pct: 0.4,
            complete_cycles: cycles,
            cycles_per_hour: 0.0,
            pct_time_above: 0.0,
            avg_cycle_duration_sec: 0.0,
            pattern_break: false,
        };
        PairOutcome {
            symbol: symbol.to_string(),
            exchange1: "a".to_string(),
            exchange2: "b".to_string(),
            status: PairStatus::Success,
            metrics: Some(PairMetrics {
                max_deviation_pct: 0.0,
                min_deviation_pct: 0.0,
                deviation_asymmetry: 0.0,
                zero_crossings: 0,
                zero_crossings_per_hour: zc_per_min * 60.0,
                zero_crossings_per_minute: zc_per_min,
                thresholds: vec![threshold_stats(0), threshold_stats(0), threshold_stats(cycles_mid)],
                data_points: 1,
                duration_hours: 1.0,
            }),
        }
    }

    fn skipped(symbol: &str) -> PairOutcome {
        PairOutcome {
            symbol: symbol.to_string(),
            exchange1: "a".to_string(),
            exchange2: "b".to_string(),
            status: PairStatus::Skipped,
            metrics: None,
        }
    }

    #[test]
    fn frequency_ranking_is_descending_and_skips_non_successes() {
        let outcomes = vec![
            outcome("LOW", 0.5, 0),
            skipped("GONE"),
            outcome("HIGH", 3.0, 0),
            outcome("MID", 1.5, 0),
        ];
        let ranked = rank_by_reversion_frequency(&outcomes);
        let symbols: Vec<&str> = ranked.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["HIGH", "MID", "LOW"]);
    }

    #[test]
    fn ties_keep_accumulation_order() {
        let outcomes = vec![
            outcome("FIRST", 1.0, 5),
            outcome("SECOND", 1.0, 5),
            outcome("THIRD", 1.0, 5),
        ];
        let by_freq = rank_by_reversion_frequency(&outcomes);
        let by_cycles = rank_by_cycle_density(&outcomes);
        for ranked in [by_freq, by_cycles] {
            let symbols: Vec<&str> = ranked.iter().map(|o| o.symbol.as_str()).collect();
            assert_eq!(symbols, vec!["FIRST", "SECOND", "THIRD"]);
        }
    }

    #[test]
    fn cycle_ranking_uses_middle_threshold() {
        let outcomes = vec![outcome("A", 0.0, 2), outcome("B", 0.0, 9)];
        let ranked = rank_by_cycle_density(&outcomes);
        assert_eq!(ranked[0].symbol, "B");
    }
}
