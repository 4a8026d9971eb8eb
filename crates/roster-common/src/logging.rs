//! Structured Logging Configuration
//!
//! - JSON output for production (`LOG_FORMAT=json` or `[logging] format = "json"`)
//! - Human-readable output for development (default)
//! - Level filtering through `RUST_LOG`, falling back to the configured level
//!
//! ```rust,ignore
//! use roster_common::logging::{init_logging, LogFormat};
//!
//! init_logging("roster-server", LogFormat::Text, "info");
//! tracing::info!(user_id = %id, "User updated");
//! ```

use std::str::FromStr;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Ok(Self::Text)
        }
    }
}

impl LogFormat {
    /// `LOG_FORMAT` wins over the configured format when it is set.
    pub fn resolve(configured: &str) -> Self {
        let raw = std::env::var("LOG_FORMAT").unwrap_or_else(|_| configured.to_string());
        raw.parse().unwrap_or_default()
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, which happens when
/// several tests in one binary initialise logging.
pub fn init_logging(service_name: &str, format: LogFormat, default_level: &str) -> bool {
    let env_filter = build_filter(default_level);

    let installed = match format {
        LogFormat::Json => init_json_logging(env_filter),
        LogFormat::Text => init_text_logging(env_filter),
    };

    if installed {
        tracing::info!(service = service_name, ?format, "Logging initialised");
    }
    installed
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_json_logging(env_filter: EnvFilter) -> bool {
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .flatten_event(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .try_init()
        .is_ok()
}

fn init_text_logging(env_filter: EnvFilter) -> bool {
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(true),
        )
        .try_init()
        .is_ok()
}
