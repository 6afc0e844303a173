//! Tracing setup for the orchestrator.
//!
//! Logs go to stderr so stdout carries only the mirrored agent stream.
//! Priority: `--log-level`, then `RUST_LOG`, then `agentrun=info`.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "agentrun=info";

/// Initialise the global subscriber. Call once at startup.
pub fn init(level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Unparseable levels are ignored.
fn filter(level: Option<&str>) -> EnvFilter {
    if let Some(level) = level.and_then(|l| l.trim().parse::<LevelFilter>().ok()) {
        return EnvFilter::new(format!("agentrun={}", level));
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_explicit_level_wins() {
        std::env::set_var("RUST_LOG", "warn");
        let rendered = filter(Some("debug")).to_string();
        std::env::remove_var("RUST_LOG");

        assert_eq!(rendered, EnvFilter::new("agentrun=debug").to_string());
    }

    #[test]
    #[serial]
    fn test_invalid_level_falls_back_to_default() {
        std::env::remove_var("RUST_LOG");
        let rendered = filter(Some("not a level")).to_string();
        assert_eq!(rendered, EnvFilter::new(DEFAULT_FILTER).to_string());
    }

    #[test]
    #[serial]
    fn test_rust_log_used_without_explicit_level() {
        std::env::set_var("RUST_LOG", "agentrun=trace");
        let rendered = filter(None).to_string();
        std::env::remove_var("RUST_LOG");

        assert_eq!(rendered, EnvFilter::new("agentrun=trace").to_string());
    }
}
