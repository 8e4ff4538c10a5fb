//! Subscriber setup for the binary. The library only emits `tracing` events.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Dependencies that are chatty at debug level.
pub const NOISY_MODULES: &[&str] = &["polars", "polars_io", "polars_core"];

fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let mut directives = String::from(level);
    for module in NOISY_MODULES {
        directives.push_str(&format!(",{module}=warn"));
    }
    EnvFilter::new(directives)
}

/// Install a global subscriber. `RUST_LOG` takes precedence over `level`.
/// `format` is `"json"` or anything else for human-readable output.
/// Calling it twice is harmless.
pub fn init_logging(level: &str, format: &str) {
    let subscriber = tracing_subscriber::registry().with(build_filter(level));

    if format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr);
        let _ = subscriber.with(fmt_layer).try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
            .with_writer(std::io::stderr);
        let _ = subscriber.with(fmt_layer).try_init();
    }

    tracing::debug!(level, format, "Logging initialized");
}
