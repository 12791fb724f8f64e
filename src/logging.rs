//! tracing subscriber setup driven by `Config::log_level` / `log_format`

use crate::config::Config;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map the configured level name; unknown names fall back to INFO
pub fn level_from_str(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `RUST_LOG` wins when set, otherwise the configured level
pub fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_from_str(&config.log_level).as_str().to_lowercase()))
}

/// Install the global subscriber. JSON unless `log_format = "text"`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(config: &Config) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    let installed = if config.log_format.eq_ignore_ascii_case("text") {
        builder.try_init()
    } else {
        builder.json().try_init()
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}
