//! Shared core types for the analyzer.
//!
//! Tick timestamps are nanoseconds since the Unix epoch throughout; duration
//! math happens on `Nanos` and is only converted to hours/minutes at the
//! reporting edge.

use std::collections::{BTreeMap, BTreeSet};

/// Nanoseconds since Unix epoch.
pub type Nanos = i64;

pub const NANOS_PER_SEC: Nanos = 1_000_000_000;
pub const NANOS_PER_MIN: Nanos = 60 * NANOS_PER_SEC;
pub const NANOS_PER_HOUR: Nanos = 60 * NANOS_PER_MIN;

/// One best-bid/offer observation for an (exchange, symbol).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickRow {
    pub timestamp: Nanos,
    pub best_bid: f64,
    pub best_ask: f64,
}

/// A chronologically sorted, null-free top-of-book series for one
/// (exchange, symbol). Produced by the loader, consumed read-only by the
/// analysis engine.
#[derive(Debug, Clone, Default)]
pub struct TickSeries {
    pub rows: Vec<TickRow>,
}

impl TickSeries {
    pub fn new(rows: Vec<TickRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Symbol name -> set of exchanges trading it. Discovery guarantees every
/// entry lists at least two exchanges; BTree ordering keeps runs reproducible.
pub type SymbolMap = BTreeMap<String, BTreeSet<String>>;
