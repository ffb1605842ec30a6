//! Diagnostic logging setup.
//!
//! The engine itself only emits `tracing` events; this installs a
//! `tracing-subscriber` fmt subscriber for applications that have none.

use crate::config::LoggingConfig;
use std::str::FromStr;
use tracing::Level;

/// Install a global fmt subscriber at the configured level. Unknown level
/// names fall back to `info`. Returns `false` if a subscriber was already
/// installed.
pub fn init(config: &LoggingConfig) -> bool {
    let level = Level::from_str(config.level.trim()).unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .try_init()
        .is_ok()
}
