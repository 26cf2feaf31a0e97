//! services/cli/src/telemetry.rs
//!
//! Logging setup. Human-readable logs go to stderr so that stdout carries only
//! assignment lines; an optional JSON trace file records span timings for the
//! course listings and visibility checks.

use crate::config::Config;
use std::fs::File;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{
    filter::Targets, fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
    EnvFilter, Layer,
};

pub fn init(config: &Config) -> std::io::Result<()> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(config.log_level.to_string()));

    let trace_file = match &config.trace_log_path {
        Some(path) => {
            let file = File::create(path)?;
            let targets = Targets::new()
                .with_target("coursework_core", Level::DEBUG)
                .with_target("cli_lib", Level::DEBUG)
                .with_target("coursework", Level::DEBUG);
            Some(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(Mutex::new(file))
                    .with_filter(targets),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(trace_file)
        .init();
    Ok(())
}
