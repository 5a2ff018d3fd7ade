//! Logging setup
//!
//! Structured logging through `tracing`. The subscriber is installed once per
//! process; `RUST_LOG` overrides the configured level.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Default filter directive
pub const DEFAULT_LEVEL: &str = "warn,urhoforge=info,urhoforge_export=info";

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default log level filter (e.g., "info", "debug", "warn")
    pub default_level: String,
    /// Show the target (module path) in log output
    pub show_target: bool,
    /// Show thread IDs in log output
    pub show_thread_ids: bool,
    /// Show source file in log output
    pub show_file: bool,
    /// Show line number in log output
    pub show_line_number: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: DEFAULT_LEVEL.to_string(),
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

impl TracingConfig {
    /// Config for a `-v` count: 0 = default, 1 = debug, 2+ = trace
    pub fn for_verbosity(verbose: u8) -> Self {
        let default_level = match verbose {
            0 => DEFAULT_LEVEL.to_string(),
            1 => "info,urhoforge=debug,urhoforge_export=debug".to_string(),
            _ => "debug,urhoforge=trace,urhoforge_export=trace".to_string(),
        };
        Self {
            default_level,
            show_thread_ids: verbose > 1,
            ..Self::default()
        }
    }
}

/// Initialize tracing with a custom configuration.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_with_config(config: TracingConfig) -> bool {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_err()
    {
        return false;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .is_ok()
}

/// Run `f` inside an `export` span and log its duration
pub fn instrument_export<T, F>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::info_span!("export", asset = %name);
    let _guard = span.enter();

    let start = Instant::now();
    let result = f();
    tracing::debug!(duration_ms = %start.elapsed().as_millis(), "Export operation complete");

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert!(config.default_level.contains("info"));
        assert!(config.show_target);
        assert!(!config.show_thread_ids);
    }

    #[test]
    fn test_verbosity_levels() {
        assert!(TracingConfig::for_verbosity(1).default_level.contains("urhoforge=debug"));
        let trace = TracingConfig::for_verbosity(3);
        assert!(trace.default_level.contains("trace"));
        assert!(trace.show_thread_ids);
    }

    #[test]
    fn test_init_only_once() {
        init_with_config(TracingConfig::default());
        assert!(!init_with_config(TracingConfig::for_verbosity(2)));
    }

    #[test]
    fn test_instrument_export() {
        assert_eq!(instrument_export("Assets/Rock.mat", || 42), 42);
    }
}
