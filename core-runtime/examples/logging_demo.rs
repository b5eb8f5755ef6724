//! Logging system demonstration
//!
//! Shows the logging infrastructure in its different output modes.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # Compact format with a custom filter
//! cargo run --example logging_demo -- compact "core_runtime=trace"
//! ```

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::env;
use tracing::{debug, error, info, instrument, span, trace, warn, Level};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace);
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    init_logging(config).expect("Failed to initialize logging");

    info!("=== Logging System Demo ===");
    info!(format = ?format, "Logging initialized");

    demo_log_levels();
    demo_structured_logging();
    demo_cycle_span().await;

    info!("=== Demo Complete ===");
}

fn demo_log_levels() {
    let span = span!(Level::INFO, "log_levels");
    let _enter = span.enter();

    trace!("This is a TRACE level log");
    debug!("This is a DEBUG level log");
    info!("This is an INFO level log");
    warn!("This is a WARN level log");
    error!("This is an ERROR level log");
}

fn demo_structured_logging() {
    let span = span!(Level::INFO, "structured_logging");
    let _enter = span.enter();

    info!("Simple message without fields");

    info!(
        trigger = "timer",
        snapshot_fetched = true,
        messages_replayed = 3,
        "Cycle summary"
    );
}

/// Mimics the span shape a sync cycle produces.
async fn demo_cycle_span() {
    let span = span!(Level::INFO, "sync_cycle", trigger = "initial");
    let _enter = span.enter();

    info!("Starting sync cycle");

    {
        let inner = span!(Level::DEBUG, "connect");
        let _inner = inner.enter();
        debug!("subscription connected");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    fetch_snapshot(42).await;

    info!(messages_replayed = 2, "Sync cycle completed");
}

#[instrument(fields(item_count = count))]
async fn fetch_snapshot(count: usize) {
    debug!("running network snapshot fetch");
    tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    info!("snapshot applied");
}
