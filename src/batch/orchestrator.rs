//! Two-level parallel batch execution.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      BatchOrchestrator                     │
//! │   (sole owner of the result set; drains the channel)       │
//! └────────────────────────────────────────────────────────────┘
//!                 │ one SymbolTask per symbol
//!                 ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │        rayon ThreadPool (fixed size = workers)             │
//! │   symbol jobs complete out of order; each sends its        │
//! │   Vec<PairOutcome> batch over a crossbeam channel          │
//! └────────────────────────────────────────────────────────────┘
//!                 │ inside one symbol job
//!                 ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │   tokio spawn_blocking fan-out: one load per exchange,     │
//! │   joined; failures contained per exchange                  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The batching is the key I/O optimization: a symbol listed on N venues is
//! loaded N times total, then every one of its C(N,2) pair analyses reuses
//! the in-memory series. Workers share no mutable state; the accumulation
//! structure is written only by the orchestrating thread after a batch
//! arrives, so no locking is needed anywhere.
//!
//! There is no cancellation or timeout: a stuck load stalls the batch.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use crossbeam::channel;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analysis::pair::{try_analyze_pair, PairMetrics};
use crate::data::loader::load_symbol_ticks;
use crate::models::{SymbolMap, TickSeries};

/// Outcome status for one exchange pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairStatus {
    Success,
    /// No data on one side, or no overlapping usable rows.
    Skipped,
    /// Contained per-pair failure; the rest of the batch is unaffected.
    Error,
}

/// One analyzed (or skipped/failed) exchange pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairOutcome {
    pub symbol: String,
    pub exchange1: String,
    pub exchange2: String,
    pub status: PairStatus,
    pub metrics: Option<PairMetrics>,
}

/// Run-wide parameters shared by every symbol task.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub data_root: PathBuf,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub thresholds: [f64; 3],
    pub zero_threshold: f64,
    /// Compute-pool size; `None` derives 3x the CPU count (each worker
    /// spends part of its time blocked on I/O before computing).
    pub workers: Option<usize>,
}

/// Unit of work dispatched to the compute pool: one symbol with every venue
/// that trades it. Consumed exactly once.
#[derive(Debug, Clone)]
struct SymbolTask {
    symbol: String,
    /// Sorted, so pair enumeration is deterministic across runs.
    exchanges: Vec<String>,
    params: Arc<RunParams>,
}

/// Aggregated result of a full batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_pairs: usize,
    pub successful: usize,
    pub skipped: usize,
    pub errors: usize,
    /// All outcomes, in completion order (ranking re-orders later).
    pub outcomes: Vec<PairOutcome>,
}

pub struct BatchOrchestrator {
    params: Arc<RunParams>,
}

impl BatchOrchestrator {
    pub fn new(params: RunParams) -> Self {
        Self {
            params: Arc::new(params),
        }
    }

    /// Run the full batch over a discovery map and accumulate every pair
    /// outcome.
    ///
    /// Fatal errors are limited to pool/runtime construction; everything
    /// else is contained at the exchange or pair level and reflected in the
    /// summary counters.
    pub fn run(&self, symbols: SymbolMap) -> Result<BatchSummary> {
        let tasks: Vec<SymbolTask> = symbols
            .into_iter()
            .map(|(symbol, exchanges)| SymbolTask {
                symbol,
                exchanges: exchanges.into_iter().collect(),
                params: Arc::clone(&self.params),
            })
            .collect();

        let total_pairs: usize = tasks.iter().map(|t| pair_count(t.exchanges.len())).sum();
        let workers = self.params.workers.unwrap_or_else(default_workers);
        info!(
            symbols = tasks.len(),
            total_pairs, workers, "starting batch analysis"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ratioscan-worker-{i}"))
            .build()
            .context("failed to build compute pool")?;
        let io = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build I/O runtime")?;

        let (tx, rx) = channel::unbounded::<Vec<PairOutcome>>();
        for task in tasks {
            let tx = tx.clone();
            let io_handle = io.handle().clone();
            pool.spawn(move || {
                let batch = analyze_symbol_batch(task, &io_handle);
                // A closed receiver means the run was abandoned; nothing to do.
                let _ = tx.send(batch);
            });
        }
        drop(tx);

        // Single-owner accumulation. Batches arrive in completion order;
        // correctness does not depend on it since ranking is a post-pass.
        let mut summary = BatchSummary {
            total_pairs,
            successful: 0,
            skipped: 0,
            errors: 0,
            outcomes: Vec::with_capacity(total_pairs),
        };
        let mut processed = 0usize;
        for batch in rx.iter() {
            for outcome in batch {
                processed += 1;
                match outcome.status {
                    PairStatus::Success => {
                        summary.successful += 1;
                        info!(
                            "[{processed}/{total_pairs}] OK {} ({} vs {})",
                            outcome.symbol, outcome.exchange1, outcome.exchange2
                        );
                    }
                    PairStatus::Skipped => summary.skipped += 1,
                    PairStatus::Error => summary.errors += 1,
                }
                summary.outcomes.push(outcome);
            }
        }

        Ok(summary)
    }
}

fn pair_count(exchanges: usize) -> usize {
    exchanges * exchanges.saturating_sub(1) / 2
}

fn default_workers() -> usize {
    let cores = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4);
    cores * 3
}

/// Analyze every exchange pair for one symbol, loading each exchange's
/// series exactly once.
fn analyze_symbol_batch(task: SymbolTask, io: &tokio::runtime::Handle) -> Vec<PairOutcome> {
    let series_by_exchange = io.block_on(load_exchanges(&task));
    debug!(
        symbol = %task.symbol,
        loaded = series_by_exchange.len(),
        venues = task.exchanges.len(),
        "symbol data loaded"
    );

    let mut outcomes = Vec::with_capacity(pair_count(task.exchanges.len()));
    for (i, ex1) in task.exchanges.iter().enumerate() {
        for ex2 in &task.exchanges[i + 1..] {
            let (status, metrics) =
                match (series_by_exchange.get(ex1), series_by_exchange.get(ex2)) {
                    (Some(series1), Some(series2)) => {
                        analyze_loaded_pair(&task, ex1, ex2, series1, series2)
                    }
                    _ => (PairStatus::Skipped, None),
                };
            outcomes.push(PairOutcome {
                symbol: task.symbol.clone(),
                exchange1: ex1.clone(),
                exchange2: ex2.clone(),
                status,
                metrics,
            });
        }
    }

    outcomes
}

fn analyze_loaded_pair(
    task: &SymbolTask,
    ex1: &str,
    ex2: &str,
    series1: &TickSeries,
    series2: &TickSeries,
) -> (PairStatus, Option<PairMetrics>) {
    match try_analyze_pair(
        series1,
        series2,
        &task.params.thresholds,
        task.params.zero_threshold,
    ) {
        Ok(Some(metrics)) => (PairStatus::Success, Some(metrics)),
        Ok(None) => (PairStatus::Skipped, None),
        Err(error) => {
            warn!(symbol = %task.symbol, ex1, ex2, %error, "pair analysis failed");
            (PairStatus::Error, None)
        }
    }
}

/// Concurrent per-exchange load fan-out for one symbol.
///
/// Every load runs independently on the blocking pool; one failed or empty
/// exchange leaves the others usable. Results are keyed by exchange name,
/// never by completion order.
async fn load_exchanges(task: &SymbolTask) -> HashMap<String, TickSeries> {
    let loads = task.exchanges.iter().map(|exchange| {
        let exchange = exchange.clone();
        let symbol = task.symbol.clone();
        let params = Arc::clone(&task.params);
        tokio::task::spawn_blocking(move || {
            let series = load_symbol_ticks(
                &params.data_root,
                &exchange,
                &symbol,
                params.start_date,
                params.end_date,
            );
            (exchange, series)
        })
    });

    let mut loaded = HashMap::new();
    for result in join_all(loads).await {
        match result {
            Ok((exchange, Some(series))) if !series.is_empty() => {
                loaded.insert(exchange, series);
            }
            Ok((exchange, _)) => {
                debug!(%exchange, symbol = %task.symbol, "no data for exchange");
            }
            Err(error) => {
                warn!(symbol = %task.symbol, %error, "exchange load task failed");
            }
        }
    }
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NANOS_PER_SEC;
    use rusqlite::Connection;
    use std::fs;
    use std::path::Path;

    fn write_chunk(root: &Path, exchange: &str, symbol: &str, ticks: &[(i64, f64)]) {
        let path = root
            .join(format!("exchange={exchange}"))
            .join(format!("symbol={symbol}"))
            .join("date=2025-11-01")
            .join("hour=00")
            .join("chunk-0.db");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let conn = Connection::open(&path).unwrap();
        conn.execute(
            "CREATE TABLE ticks (ts_ns INTEGER NOT NULL, best_bid REAL, best_ask REAL)",
            [],
        )
        .unwrap();
        for (ts_ns, bid) in ticks {
            conn.execute(
                "INSERT INTO ticks (ts_ns, best_bid, best_ask) VALUES (?1, ?2, ?3)",
                rusqlite::params![ts_ns, bid, bid + 0.01],
            )
            .unwrap();
        }
    }

    fn empty_symbol_dir(root: &Path, exchange: &str, symbol: &str) {
        fs::create_dir_all(
            root.join(format!("exchange={exchange}"))
                .join(format!("symbol={symbol}")),
        )
        .unwrap();
    }

    fn params(root: &Path) -> RunParams {
        RunParams {
            data_root: root.to_path_buf(),
            start_date: None,
            end_date: None,
            thresholds: [0.3, 0.5, 0.4],
            zero_threshold: 0.05,
            workers: Some(2),
        }
    }

    fn flat_ticks(n: i64, bid: f64) -> Vec<(i64, f64)> {
        (0..n).map(|s| (s * NANOS_PER_SEC, bid)).collect()
    }

    #[test]
    fn batch_counts_add_up_and_missing_data_is_skipped() {
        let store = tempfile::tempdir().unwrap();
        // BTC on three venues, but OKX has an empty partition tree.
        write_chunk(store.path(), "Binance", "BTC_USDT", &flat_ticks(100, 100.0));
        write_chunk(store.path(), "Bybit", "BTC_USDT", &flat_ticks(100, 100.0));
        empty_symbol_dir(store.path(), "OKX", "BTC_USDT");
        // ETH on two venues, both populated.
        write_chunk(store.path(), "Binance", "ETH_USDT", &flat_ticks(50, 2000.0));
        write_chunk(store.path(), "Bybit", "ETH_USDT", &flat_ticks(50, 2000.0));

        let symbols = crate::data::discover_symbols(store.path()).unwrap();
        let summary = BatchOrchestrator::new(params(store.path()))
            .run(symbols)
            .unwrap();

        // BTC: 3 pairs (1 success, 2 skipped via OKX); ETH: 1 pair.
        assert_eq!(summary.total_pairs, 4);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.outcomes.len(), summary.total_pairs);

        let skipped: Vec<_> = summary
            .outcomes
            .iter()
            .filter(|o| o.status == PairStatus::Skipped)
            .collect();
        assert!(skipped.iter().all(|o| o.exchange1 == "OKX" || o.exchange2 == "OKX"));
        assert!(skipped.iter().all(|o| o.metrics.is_none()));
    }

    #[test]
    fn pair_order_is_deterministic_and_sorted() {
        let store = tempfile::tempdir().unwrap();
        for exchange in ["Zeta", "Alpha", "Mid"] {
            write_chunk(store.path(), exchange, "BTC_USDT", &flat_ticks(10, 100.0));
        }
        let symbols = crate::data::discover_symbols(store.path()).unwrap();
        let summary = BatchOrchestrator::new(params(store.path()))
            .run(symbols)
            .unwrap();

        let pairs: Vec<(String, String)> = summary
            .outcomes
            .iter()
            .map(|o| (o.exchange1.clone(), o.exchange2.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Alpha".to_string(), "Mid".to_string()),
                ("Alpha".to_string(), "Zeta".to_string()),
                ("Mid".to_string(), "Zeta".to_string()),
            ]
        );
    }

    #[test]
    fn empty_symbol_map_yields_empty_summary() {
        let store = tempfile::tempdir().unwrap();
        let summary = BatchOrchestrator::new(params(store.path()))
            .run(SymbolMap::new())
            .unwrap();
        assert_eq!(summary.total_pairs, 0);
        assert!(summary.outcomes.is_empty());
    }

    #[test]
    fn date_filter_flows_through_to_loads() {
        let store = tempfile::tempdir().unwrap();
        write_chunk(store.path(), "Binance", "BTC_USDT", &flat_ticks(10, 100.0));
        write_chunk(store.path(), "Bybit", "BTC_USDT", &flat_ticks(10, 100.0));

        let mut p = params(store.path());
        p.start_date = chrono::NaiveDate::from_ymd_opt(2025, 12, 1);
        let symbols = crate::data::discover_symbols(store.path()).unwrap();
        let summary = BatchOrchestrator::new(p).run(symbols).unwrap();

        // All data is before the start date: the pair is skipped, not failed.
        assert_eq!(summary.successful, 0);
        assert_eq!(summary.skipped, 1);
    }
}
