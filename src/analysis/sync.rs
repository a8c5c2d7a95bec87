//! Backward as-of synchronization of two tick series.
//!
//! Every anchor row is paired with the most recent secondary observation at
//! or before its timestamp. Pairing with a future secondary row is forbidden;
//! that is what keeps the downstream ratio series free of look-ahead bias.
//! There is no interpolation and no forward fill beyond the as-of rule.

use crate::models::{Nanos, TickSeries};

/// One anchor row joined with its as-of secondary observation.
///
/// Secondary fields are `None` when the secondary series has no observation
/// at or before the anchor timestamp; such rows are excluded from numeric
/// aggregates downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncedRow {
    pub timestamp: Nanos,
    pub bid_ex1: f64,
    pub ask_ex1: f64,
    pub bid_ex2: Option<f64>,
    pub ask_ex2: Option<f64>,
}

/// Join `anchor` against `secondary` with backward as-of semantics.
///
/// The result has exactly one row per anchor row, in anchor order. Either
/// input being empty yields an empty result, which signals "no analysis
/// possible" rather than an error.
pub fn synchronize(anchor: &TickSeries, secondary: &TickSeries) -> Vec<SyncedRow> {
    if anchor.is_empty() || secondary.is_empty() {
        return Vec::new();
    }

    let sec = &secondary.rows;
    let mut out = Vec::with_capacity(anchor.len());
    // First secondary index strictly after the current anchor timestamp.
    // Both series are sorted, so this only ever moves forward.
    let mut j = 0usize;

    for row in &anchor.rows {
        while j < sec.len() && sec[j].timestamp <= row.timestamp {
            j += 1;
        }
        let matched = if j == 0 { None } else { Some(&sec[j - 1]) };
        out.push(SyncedRow {
            timestamp: row.timestamp,
            bid_ex1: row.best_bid,
            ask_ex1: row.best_ask,
            bid_ex2: matched.map(|m| m.best_bid),
            ask_ex2: matched.map(|m| m.best_ask),
        });
    }

    out
}
