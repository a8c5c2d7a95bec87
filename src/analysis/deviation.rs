//! Parity-deviation series derived from a synchronized pair of tick series.
//!
//! The deviation is measured from exact price parity (ratio 1.0), never from
//! the sample mean of the ratio. Zero must mean "positions close at
//! break-even"; centering on the mean would label the average price gap as
//! break-even, which is unsound for a strategy that exits at price equality.

use crate::analysis::sync::SyncedRow;

/// Per-row percentage deviation of `bid_ex1 / bid_ex2` from parity.
///
/// `None` marks rows where the deviation is undefined: the secondary side is
/// unmatched or its bid is zero. Undefined rows are excluded from every
/// aggregate but keep the series co-indexed with the synchronized rows.
pub fn deviation_series(rows: &[SyncedRow]) -> Vec<Option<f64>> {
    rows.iter()
        .map(|row| match row.bid_ex2 {
            Some(bid2) if bid2 != 0.0 => Some((row.bid_ex1 / bid2 - 1.0) * 100.0),
            _ => None,
        })
        .collect()
}

/// Whole-series aggregates over the defined deviation values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviationStats {
    pub max_pct: f64,
    pub min_pct: f64,
    /// Mean deviation, reported as directional-bias indicator: near zero for
    /// symmetric oscillation around parity, large magnitude for a persistent
    /// one-sided premium or discount.
    pub asymmetry: f64,
    /// Count of rows with a defined deviation.
    pub defined_rows: usize,
}

/// Compute max/min/mean over the defined values. Returns `None` when the
/// series has no defined value at all (no overlapping usable data).
pub fn deviation_stats(deviation: &[Option<f64>]) -> Option<DeviationStats> {
    let mut max_pct = f64::NEG_INFINITY;
    let mut min_pct = f64::INFINITY;
    let mut sum = 0.0;
    let mut defined_rows = 0usize;

    for value in deviation.iter().flatten() {
        max_pct = max_pct.max(*value);
        min_pct = min_pct.min(*value);
        sum += *value;
        defined_rows += 1;
    }

    if defined_rows == 0 {
        return None;
    }

    Some(DeviationStats {
        max_pct,
        min_pct,
        asymmetry: sum / defined_rows as f64,
        defined_rows,
    })
}
