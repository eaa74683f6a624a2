//! Log setup for `bubbl-device`.
//!
//! When the device serves over stdio, stdout carries the replies to the
//! host, so every event goes to stderr.

use clap::ValueEnum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How events are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, for a bench with a terminal attached.
    Pretty,
    /// One JSON object per line, for logs pulled off the device.
    Json,
}

/// Install the global subscriber. `RUST_LOG`, when set, wins over
/// `directives` (the `--log-level` value).
pub fn init_logging(directives: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    tracing::debug!(?format, directives, "logging ready");
}
