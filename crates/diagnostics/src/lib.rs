// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Logging setup shared by the pipeline binaries.
//!
//! The level comes from the `PIPELINE_LOG` environment variable:
//! - `off` (default): nothing is emitted
//! - `error`, `warn`, `info`, `debug`: events at or above that level go to stderr
//!
//! Library code logs through the `info!`, `debug!`, `warn!` and `error!`
//! macros exported here. User-facing output (per-file status lines, report
//! tables) is printed by the binaries, not logged.

use std::sync::Once;

// Re-export emit so the macros resolve in downstream crates
pub use emit;

/// Environment variable selecting the log level
pub const LOG_ENV: &str = "PIPELINE_LOG";

static INIT: Once = Once::new();

/// Parse a `PIPELINE_LOG` value. `None` means logging is off.
///
/// Unknown values fall back to `Info` and are reported by the caller.
fn parse_level(value: &str) -> Result<Option<emit::Level>, emit::Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => Ok(None),
        "error" => Ok(Some(emit::Level::Error)),
        "warn" => Ok(Some(emit::Level::Warn)),
        "info" => Ok(Some(emit::Level::Info)),
        "debug" => Ok(Some(emit::Level::Debug)),
        _ => Err(emit::Level::Info),
    }
}

/// Initialize diagnostics from `PIPELINE_LOG`.
///
/// Call once at startup; later calls are ignored.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let value = std::env::var(LOG_ENV).unwrap_or_else(|_| "off".to_string());

        let level = match parse_level(&value) {
            Ok(Some(level)) => level,
            Ok(None) => return,
            Err(fallback) => {
                // The emitter is not running yet, so this one goes straight to stderr
                eprintln!("Warning: Unknown {LOG_ENV} value '{value}', using 'info'");
                fallback
            }
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // Keep the emitter alive for the life of the process
        std::mem::forget(rt);
    });
}

/// Log basic operations: tables created, files skipped, reports run.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics: SQL text, inferred column types, row counts.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable problems: missing inputs, fallbacks.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures of a unit of work.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("off"), Ok(None));
        assert_eq!(parse_level(""), Ok(None));
        assert_eq!(parse_level("DEBUG"), Ok(Some(emit::Level::Debug)));
        assert_eq!(parse_level(" warn "), Ok(Some(emit::Level::Warn)));
        assert_eq!(parse_level("verbose"), Err(emit::Level::Info));
    }

    #[test]
    fn test_init_is_safe_to_call_multiple_times() {
        init_diagnostics();
        init_diagnostics();
    }

    #[test]
    fn test_macros_compile() {
        let table = "credit_data_20250101";
        info!("Loaded {table}", table: table);
        debug!("Inferred {count} columns", count: 3);
        warn!("Missing source");
        error!("Load failed");
    }
}
