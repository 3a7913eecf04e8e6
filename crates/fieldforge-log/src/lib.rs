//! Structured logging for FieldForge.
//!
//! Installs a `tracing` subscriber with console output, optional JSON file
//! output in debug builds, and a filter driven by `RUST_LOG` or the
//! configured log level.

use fieldforge_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written into the log directory.
pub const LOG_FILE_NAME: &str = "fieldforge.log";

/// Initialize the tracing subscriber.
///
/// * `log_dir` - Optional directory for JSON log files (debug builds only)
/// * `debug_build` - Whether this is a debug build (enables file logging)
/// * `config` - Optional configuration to use for log level override
///
/// Calling this twice in one process is harmless: the second installation
/// attempt is ignored.
///
/// ```no_run
/// use fieldforge_config::Config;
/// use fieldforge_log::init_logging;
///
/// let config = Config::default();
/// init_logging(None, false, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_for(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        if subscriber.with(file_layer).try_init().is_ok() {
            tracing::debug!("Logging to {}", log_dir.join(LOG_FILE_NAME).display());
        }
        return;
    }

    if subscriber.try_init().is_ok() {
        tracing::debug!("Logging initialized with filter {filter_str:?}");
    }
}

/// Returns the filter string for the given config.
///
/// An empty configured level falls back to [`DEFAULT_FILTER`].
pub fn filter_for(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        let filter = default_env_filter();
        assert!(format!("{}", filter).contains("info"));
    }

    #[test]
    fn test_filter_follows_config() {
        let mut config = Config::default();
        config.debug.log_level = "fieldforge_scheduler=debug".to_string();
        assert_eq!(filter_for(Some(&config)), "fieldforge_scheduler=debug");
    }

    #[test]
    fn test_empty_config_level_uses_default() {
        let mut config = Config::default();
        config.debug.log_level.clear();
        assert_eq!(filter_for(Some(&config)), DEFAULT_FILTER);
        assert_eq!(filter_for(None), DEFAULT_FILTER);
    }

    #[test]
    fn test_verbose_config_parses_as_filter() {
        let mut config = Config::default();
        config.apply_verbosity(true);
        let result = EnvFilter::try_new(filter_for(Some(&config)));
        assert!(result.is_ok());
    }

    #[test]
    fn test_env_filter_parsing() {
        let valid_filters = [
            "info",
            "debug,fieldforge_scheduler=trace",
            "warn,fieldforge_harness=debug",
            "error",
        ];

        for filter_str in &valid_filters {
            let result = EnvFilter::try_new(*filter_str);
            assert!(result.is_ok(), "Failed to parse filter: {}", filter_str);
        }
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        init_logging(Some(dir.path()), true, None);
        init_logging(None, false, None);
        assert!(dir.path().join(LOG_FILE_NAME).exists());
    }
}
