//! Browser console logging for the `log` facade, via `wasm-logger`.
//!
//! The level can be set per page through the container's `data-log-level`
//! attribute.

use log::{Level, LevelFilter};
use std::sync::Once;

static INSTALL: Once = Once::new();

/// Parse a level name such as `debug` or `WARN`. Unknown names yield `None`.
pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    raw.trim().parse().ok()
}

/// Level handed to the console logger. `Off` still installs the logger at
/// `Error` and is then muted through the global max level.
fn logger_level(level: LevelFilter) -> Level {
    level.to_level().unwrap_or(Level::Error)
}

/// Install the console logger. Later calls only adjust the global max level.
pub fn init(level: LevelFilter) {
    INSTALL.call_once(|| wasm_logger::init(wasm_logger::Config::new(logger_level(level))));
    log::set_max_level(level);
}
