//! Partitioned tick-store reader.
//!
//! Store layout, one SQLite tick file per captured chunk:
//!
//! ```text
//! <root>/exchange=<EX>/symbol=<SYM>/date=<YYYY-MM-DD>/hour=<HH>/<chunk>.db
//! ```
//!
//! Each tick file carries a `ticks` table with `ts_ns INTEGER`,
//! `best_bid REAL`, `best_ask REAL`. Loading is a two-stage query: first
//! enumerate the candidate partitions (pruned by the inclusive date range),
//! then open each matching file as a scoped read-only connection. A corrupt
//! or unreadable chunk is logged and skipped; it never fails the load.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::data::discovery::partition_value;
use crate::models::{TickRow, TickSeries};

/// Partition formats tried when resolving a symbol directory, newest first:
/// `BASE_QUOTE` (collector standard), `BASE#QUOTE` (legacy), separator-free.
fn symbol_formats(symbol: &str) -> [String; 3] {
    [
        symbol.replace('/', "_"),
        symbol.replace('/', "#"),
        symbol.replace(['/', '_'], ""),
    ]
}

fn resolve_symbol_dir(data_root: &Path, exchange: &str, symbol: &str) -> Option<PathBuf> {
    let exchange_path = data_root.join(format!("exchange={exchange}"));
    if !exchange_path.is_dir() {
        return None;
    }
    symbol_formats(symbol)
        .iter()
        .map(|fmt| exchange_path.join(format!("symbol={fmt}")))
        .find(|candidate| candidate.is_dir())
}

/// Stage one: enumerate tick files under the date/hour partitions that
/// survive the inclusive date-range pruning.
fn candidate_files(
    symbol_dir: &Path,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let Ok(date_entries) = std::fs::read_dir(symbol_dir) else {
        return files;
    };
    for date_entry in date_entries.flatten() {
        if !date_entry.path().is_dir() {
            continue;
        }
        let dir_name = date_entry.file_name().to_string_lossy().into_owned();
        let Some(date_str) = partition_value(&dir_name, "date") else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            debug!(partition = %dir_name, "skipping unparseable date partition");
            continue;
        };
        if start_date.is_some_and(|start| date < start) || end_date.is_some_and(|end| date > end) {
            continue;
        }

        let Ok(hour_entries) = std::fs::read_dir(date_entry.path()) else {
            continue;
        };
        for hour_entry in hour_entries.flatten() {
            let hour_path = hour_entry.path();
            let hour_name = hour_entry.file_name().to_string_lossy().into_owned();
            if !hour_path.is_dir() || partition_value(&hour_name, "hour").is_none() {
                continue;
            }
            let Ok(chunks) = std::fs::read_dir(&hour_path) else {
                continue;
            };
            for chunk in chunks.flatten() {
                let path = chunk.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some("db") {
                    files.push(path);
                }
            }
        }
    }

    // Deterministic read order across runs.
    files.sort();
    files
}

/// Stage two: read one tick file. The connection is scoped to this call and
/// closed on every exit path. NULL bids/asks are filtered in SQL.
fn read_tick_file(path: &Path) -> Result<Vec<TickRow>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open tick file: {}", path.display()))?;

    let mut stmt = conn
        .prepare(
            "SELECT ts_ns, best_bid, best_ask FROM ticks \
             WHERE best_bid IS NOT NULL AND best_ask IS NOT NULL",
        )
        .with_context(|| format!("bad tick schema in {}", path.display()))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(TickRow {
                timestamp: row.get(0)?,
                best_bid: row.get(1)?,
                best_ask: row.get(2)?,
            })
        })
        .context("tick query failed")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("failed to read ticks from {}", path.display()))?;

    Ok(rows)
}

/// Load every tick for (exchange, symbol) within the optional inclusive date
/// range.
///
/// `None` is the explicit "no data" signal: missing directories, no matching
/// partitions, or zero usable rows. It is not an error; a pair missing one
/// side's data is skipped by the orchestrator, not failed.
pub fn load_symbol_ticks(
    data_root: &Path,
    exchange: &str,
    symbol: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Option<TickSeries> {
    let symbol_dir = resolve_symbol_dir(data_root, exchange, symbol)?;
    let files = candidate_files(&symbol_dir, start_date, end_date);
    if files.is_empty() {
        return None;
    }

    let mut rows: Vec<TickRow> = Vec::new();
    for file in &files {
        match read_tick_file(file) {
            Ok(chunk) => rows.extend(chunk),
            Err(error) => {
                warn!(file = %file.display(), %error, "skipping unreadable tick chunk");
            }
        }
    }

    if rows.is_empty() {
        return None;
    }
    rows.sort_by_key(|row| row.timestamp);

    debug!(
        exchange,
        symbol,
        rows = rows.len(),
        chunks = files.len(),
        "loaded tick series"
    );
    Some(TickSeries::new(rows))
}
