//! Logging utilities
//!
//! File-backed logging plus a panic hook, built on a `simplelog` file writer.

use crate::error::MatchError;
use log::LevelFilter;
use simplelog::{CombinedLogger, Config, WriteLogger};
use std::error::Error;
use std::fs::File;
use std::path::Path;

static LOG_INITIALIZED: std::sync::Once = std::sync::Once::new();

/// Initialize logging to a file at `log_path`. Safe to call more than once;
/// only the first call takes effect.
pub fn init_logging(log_path: &Path) {
    LOG_INITIALIZED.call_once(|| {
        match File::options().create(true).append(true).open(log_path) {
            Ok(log_file) => {
                let config = Config::default();
                if let Err(e) = CombinedLogger::init(vec![WriteLogger::new(
                    LevelFilter::Debug,
                    config,
                    log_file,
                )]) {
                    eprintln!("failed to initialize logger: {}", e);
                } else {
                    log::info!("=== matching core logging initialized ===");
                    log::info!("log file: {}", log_path.display());
                }
            }
            Err(e) => {
                eprintln!("failed to open log file at {}: {}", log_path.display(), e);
            }
        }
    });
}

/// Install a panic hook that logs the panic message and location.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let panic_message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "unknown location".to_string());

        log::error!("PANIC: {} at {}", panic_message, location);
        eprintln!("PANIC: {} at {}", panic_message, location);
    }));
}

/// Log an error with its source chain.
pub fn log_error(context: &str, error: &dyn Error) {
    log::error!("[{}] error: {}", context, error);
    let mut current: Option<&dyn Error> = error.source();
    let mut depth = 0;
    while let Some(err) = current {
        log::error!("[{}] caused by (level {}): {}", context, depth + 1, err);
        current = err.source();
        depth += 1;
        if depth > 10 {
            log::warn!("[{}] error chain too deep, truncating", context);
            break;
        }
    }
}

/// Log a `MatchError` with variant-specific context beyond the top-level
/// `Display` message.
pub fn log_match_error(context: &str, error: &MatchError) {
    log::error!("[{}] {}", context, error);
    match error {
        MatchError::Database(db_err) => log::error!("[{}] database detail: {:?}", context, db_err),
        MatchError::LlmUnavailable(msg) => log::warn!("[{}] LLM unavailable: {}", context, msg),
        MatchError::EmbeddingMissing(ctx) => log::warn!("[{}] embedding missing: {}", context, ctx),
        MatchError::Validation(msg) => log::warn!("[{}] validation: {}", context, msg),
        MatchError::Configuration(msg) => log::warn!("[{}] configuration: {}", context, msg),
        _ => {}
    }
}

pub fn log_info(context: &str, message: &str) {
    log::info!("[{}] {}", context, message);
}

pub fn log_warning(context: &str, message: &str) {
    log::warn!("[{}] {}", context, message);
}
