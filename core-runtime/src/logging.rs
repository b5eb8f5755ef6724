//! # Logging & Tracing Infrastructure
//!
//! Configures the `tracing-subscriber` stack for the sync core:
//! - Pretty, compact, or JSON output formats
//! - Module-level filtering via `EnvFilter` directives
//! - Optional mirroring of events into a host [`LoggerSink`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::LogLevel;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug);
//!
//! init_logging(config).expect("Failed to initialize logging");
//! tracing::info!("sync core started");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

use crate::error::{Error, Result};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    Compact,
    /// Structured JSON format for machine parsing
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level when no custom filter is set
    pub level: LogLevel,
    /// Custom filter directives (e.g., "core_sync=trace,bridge_traits=info")
    pub filter: Option<String>,
    /// Optional sink mirroring events to host logging
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Display the target module in output
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            logger_sink: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set minimum log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set custom filter directives
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set logger sink for host integration
    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// The `EnvFilter` directive string this configuration resolves to.
    pub fn filter_directives(&self) -> String {
        match &self.filter {
            Some(custom) => custom.clone(),
            None => level_directive(self.level).to_string(),
        }
    }
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn convert_level(level: &tracing::Level) -> LogLevel {
    if *level == tracing::Level::ERROR {
        LogLevel::Error
    } else if *level == tracing::Level::WARN {
        LogLevel::Warn
    } else if *level == tracing::Level::INFO {
        LogLevel::Info
    } else if *level == tracing::Level::DEBUG {
        LogLevel::Debug
    } else {
        LogLevel::Trace
    }
}

/// Initialize the global tracing subscriber.
///
/// This should be called once during application startup. Subsequent calls
/// return an error.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.filter_directives())
        .map_err(|e| Error::Logging(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(config.display_target)
            .pretty()
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .with_target(config.display_target)
            .compact()
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_target(config.display_target)
            .json()
            .boxed(),
    };

    let sink_layer = config.logger_sink.map(|sink| SinkLayer { sink });

    tracing_subscriber::registry()
        .with(filter)
        .with(sink_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

// ============================================================================
// LoggerSink Mirror Layer
// ============================================================================

/// Collects the message and fields recorded on an event.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}

/// Mirrors filtered events into a host `LoggerSink`.
struct SinkLayer {
    sink: Arc<dyn LoggerSink>,
}

impl<S> Layer<S> for SinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = convert_level(metadata.level());
        if level < self.sink.min_level() {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut entry = LogEntry::new(level, metadata.target(), visitor.message);
        entry.fields = visitor.fields;

        // The sink is async; forward on the runtime when one is available and
        // drop the entry otherwise rather than blocking the caller.
        let sink = Arc::clone(&self.sink);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = sink.log(entry).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_directives() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        assert_eq!(config.filter_directives(), "debug");
    }

    #[test]
    fn test_custom_filter_wins_over_level() {
        let config = LoggingConfig::default()
            .with_level(LogLevel::Error)
            .with_filter("core_sync=trace");
        assert_eq!(config.filter_directives(), "core_sync=trace");
    }

    #[test]
    fn test_level_conversion() {
        assert_eq!(convert_level(&tracing::Level::ERROR), LogLevel::Error);
        assert_eq!(convert_level(&tracing::Level::TRACE), LogLevel::Trace);
    }
}
