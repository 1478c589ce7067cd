//! Tracing setup for the server binary.
//!
//! The filter comes from `logging.level` unless `RUST_LOG` is set. HTTP
//! transport crates are capped at `warn` so request-level events from the
//! cache and the router stay readable at `debug`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Transport crates that are too chatty below `warn`.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "h2", "reqwest", "redis"];

/// Filter directives for a configured level.
pub fn filter_directives(level: &str) -> String {
    let mut directives = level.to_ascii_lowercase();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{target}=warn"));
    }
    directives
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(filter_directives(&logging.level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_quiet_transport_crates() {
        let directives = filter_directives("DEBUG");
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("hyper=warn"));
        assert!(directives.contains("redis=warn"));
        assert!(!directives.contains("readthru"));
    }

    #[test]
    fn test_directives_parse_for_every_valid_level() {
        for level in ["trace", "debug", "info", "warn", "error", "off"] {
            assert!(EnvFilter::try_new(filter_directives(level)).is_ok(), "{level}");
        }
    }
}
