//! Tick-store access: partition discovery and series loading.

pub mod discovery;
pub mod loader;

pub use discovery::{apply_exchange_filter, discover_symbols};
pub use loader::load_symbol_ticks;
