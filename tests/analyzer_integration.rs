//! End-to-end integration test for the batch analyzer.
//!
//! Builds a real partitioned tick store in a temp directory, runs discovery
//! and the full two-level batch, and checks the persisted reports.

use rusqlite::Connection;
use std::fs;
use std::path::Path;

use ratioscan::batch::{rank_by_reversion_frequency, BatchOrchestrator, PairStatus, RunParams};
use ratioscan::data::discover_symbols;
use ratioscan::models::NANOS_PER_SEC;
use ratioscan::report::{write_csv_report, write_json_report};

fn write_chunk(root: &Path, exchange: &str, symbol: &str, date: &str, ticks: &[(i64, f64)]) {
    let path = root
        .join(format!("exchange={exchange}"))
        .join(format!("symbol={symbol}"))
        .join(format!("date={date}"))
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

/// One hour at one tick per second, oscillating through parity: swing highs
/// and lows of +-`swing_pct` with near-zero samples in between.
fn oscillating_hour(base: f64, swing_pct: f64) -> Vec<(i64, f64)> {
    let swing = base * swing_pct / 100.0;
    let nudge = base * 0.0004; // inside the 0.05% neutral band, sign-flipping
    let pattern = [base + swing, base - nudge, base - swing, base + nudge];
    (0..3600)
        .map(|s| (s * NANOS_PER_SEC, pattern[(s % 4) as usize]))
        .collect()
}

fn flat_hour(base: f64) -> Vec<(i64, f64)> {
    (0..3600).map(|s| (s * NANOS_PER_SEC, base)).collect()
}

#[test]
fn full_batch_over_fixture_store() {
    let store = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    // BTC: Binance oscillates +-0.6% against a flat Bybit -> rich metrics.
    write_chunk(
        store.path(),
        "Binance",
        "BTC_USDT",
        "2025-11-01",
        &oscillating_hour(100.0, 0.6),
    );
    write_chunk(
        store.path(),
        "Bybit",
        "BTC_USDT",
        "2025-11-01",
        &flat_hour(100.0),
    );
    // ETH: flat on both venues -> valid but quiet pair.
    write_chunk(
        store.path(),
        "Binance",
        "ETH_USDT",
        "2025-11-01",
        &flat_hour(2000.0),
    );
    write_chunk(
        store.path(),
        "OKX",
        "ETH_USDT",
        "2025-11-01",
        &flat_hour(2000.0),
    );
    // DOGE: single venue -> never discovered as a pair.
    write_chunk(
        store.path(),
        "Binance",
        "DOGE_USDT",
        "2025-11-01",
        &flat_hour(0.1),
    );

    let symbols = discover_symbols(store.path()).unwrap();
    assert_eq!(symbols.len(), 2);

    let orchestrator = BatchOrchestrator::new(RunParams {
        data_root: store.path().to_path_buf(),
        start_date: None,
        end_date: None,
        thresholds: [0.3, 0.5, 0.4],
        zero_threshold: 0.05,
        workers: Some(2),
    });
    let summary = orchestrator.run(symbols).unwrap();

    assert_eq!(summary.total_pairs, 2);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.errors, 0);

    let btc = summary
        .outcomes
        .iter()
        .find(|o| o.symbol == "BTC/USDT")
        .unwrap();
    assert_eq!(btc.status, PairStatus::Success);
    let metrics = btc.metrics.as_ref().unwrap();
    assert!(metrics.zero_crossings > 0);
    assert!((metrics.duration_hours - 1.0).abs() < 0.01);
    // 0.6% swings complete cycles at every configured threshold, and the
    // series ends on a near-parity sample so no excursion is left open.
    for t in &metrics.thresholds {
        assert!(t.complete_cycles > 0, "threshold {}", t.threshold_pct);
        assert!(!t.pattern_break);
    }

    // The oscillating pair outranks the quiet one.
    let ranked = rank_by_reversion_frequency(&summary.outcomes);
    assert_eq!(ranked[0].symbol, "BTC/USDT");
    assert_eq!(ranked[1].symbol, "ETH/USDT");

    let csv_path = write_csv_report(output.path(), &ranked, &[0.3, 0.5, 0.4]).unwrap();
    let csv = fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().contains("opportunity_cycles_030bp"));
    assert!(lines.next().unwrap().starts_with("BTC/USDT,Binance,Bybit"));
    assert!(lines.next().unwrap().starts_with("ETH/USDT,Binance,OKX"));

    let json_path = write_json_report(output.path(), &summary).unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(parsed["total_pairs"], 2);
    assert_eq!(parsed["outcomes"].as_array().unwrap().len(), 2);
}

#[test]
fn partial_store_reports_skips_without_aborting() {
    let store = tempfile::tempdir().unwrap();

    write_chunk(
        store.path(),
        "Binance",
        "BTC_USDT",
        "2025-11-01",
        &flat_hour(100.0),
    );
    write_chunk(
        store.path(),
        "Bybit",
        "BTC_USDT",
        "2025-11-01",
        &flat_hour(100.0),
    );
    // OKX lists the symbol but has no captured ticks at all.
    fs::create_dir_all(
        store
            .path()
            .join("exchange=OKX")
            .join("symbol=BTC_USDT"),
    )
    .unwrap();

    let symbols = discover_symbols(store.path()).unwrap();
    let summary = BatchOrchestrator::new(RunParams {
        data_root: store.path().to_path_buf(),
        start_date: None,
        end_date: None,
        thresholds: [0.3, 0.5, 0.4],
        zero_threshold: 0.05,
        workers: Some(2),
    })
    .run(symbols)
    .unwrap();

    assert_eq!(summary.total_pairs, 3);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.errors, 0);
}
