//! Environment-driven logging setup.
//!
//! `PR_LOG_LEVEL` takes any `tracing_subscriber::EnvFilter` directive string
//! (default "info"); `PR_LOG_FORMAT` selects "compact" or "json" output.
//! Logs go to stderr so stdout stays free for piped results.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let format = match std::env::var("PR_LOG_FORMAT").as_deref().unwrap_or("compact") {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        };
        let level = std::env::var("PR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        Self { format, level }
    }
}

pub fn init_logging() -> Result<()> {
    let config = LoggingConfig::from_env();
    let env_filter = EnvFilter::new(&config.level);

    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(fmt_layer).init();
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(env_filter);
            tracing_subscriber::registry().with(fmt_layer).init();
        }
    }

    tracing::debug!(format = ?config.format, level = %config.level, "logging initialized");
    Ok(())
}
