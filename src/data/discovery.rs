//! Tick-store discovery.
//!
//! Scans the partition root for `exchange=<name>/symbol=<raw>` directories
//! and builds the symbol -> exchanges map the orchestrator batches over.
//! Only symbols present on at least two exchanges can form a pair, so
//! everything else is dropped here.

use anyhow::{ensure, Context, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

use crate::models::SymbolMap;

/// Convert a raw partition symbol back to canonical `BASE/QUOTE` form.
///
/// The collector writes `VIRTUAL_USDT`; older captures used `VIRTUAL#USDT`.
fn normalize_symbol(raw: &str) -> String {
    if raw.contains("_USDT") {
        raw.replace("_USDT", "/USDT")
    } else if raw.contains("_USDC") {
        raw.replace("_USDC", "/USDC")
    } else {
        raw.replace('#', "/")
    }
}

/// Value of a `key=value` partition directory name, if it matches `key`.
pub(crate) fn partition_value<'a>(name: &'a str, key: &str) -> Option<&'a str> {
    name.strip_prefix(key).and_then(|rest| rest.strip_prefix('='))
}

/// Scan the store and group symbols by exchange.
///
/// Returns only symbols trading on two or more exchanges. An empty result is
/// a valid outcome (nothing to analyze), but a missing root is an error.
pub fn discover_symbols(data_root: &Path) -> Result<SymbolMap> {
    info!(root = %data_root.display(), "scanning tick store");
    ensure!(
        data_root.is_dir(),
        "data path does not exist: {}",
        data_root.display()
    );

    let mut symbol_map = SymbolMap::new();

    let entries = std::fs::read_dir(data_root)
        .with_context(|| format!("failed to read data root: {}", data_root.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        let Some(exchange) = partition_value(&dir_name, "exchange") else {
            continue;
        };

        for symbol_entry in std::fs::read_dir(entry.path())? {
            let symbol_entry = symbol_entry?;
            if !symbol_entry.file_type()?.is_dir() {
                continue;
            }
            let symbol_dir = symbol_entry.file_name().to_string_lossy().into_owned();
            let Some(raw_symbol) = partition_value(&symbol_dir, "symbol") else {
                continue;
            };

            symbol_map
                .entry(normalize_symbol(raw_symbol))
                .or_default()
                .insert(exchange.to_string());
        }
    }

    let total = symbol_map.len();
    symbol_map.retain(|_, exchanges| exchanges.len() >= 2);
    info!(
        pairable = symbol_map.len(),
        single_venue = total - symbol_map.len(),
        "discovery complete"
    );

    Ok(symbol_map)
}

/// Restrict a discovery map to the configured exchanges, re-applying the
/// two-venue rule to the intersection.
pub fn apply_exchange_filter(symbol_map: SymbolMap, exchanges: &[String]) -> SymbolMap {
    let allowed: BTreeSet<&str> = exchanges.iter().map(String::as_str).collect();
    let mut filtered = SymbolMap::new();

    for (symbol, venues) in symbol_map {
        let kept: BTreeSet<String> = venues
            .into_iter()
            .filter(|v| allowed.contains(v.as_str()))
            .collect();
        if kept.len() >= 2 {
            filtered.insert(symbol, kept);
        } else {
            debug!(%symbol, "dropped by exchange filter");
        }
    }

    filtered
}
