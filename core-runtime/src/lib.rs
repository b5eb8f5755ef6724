//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the sync core:
//! - Logging and tracing infrastructure
//! - Diagnostic event bus
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the engine crates depend on. It
//! establishes the logging conventions and the event broadcasting mechanism
//! used for diagnostics; consumer-facing results never flow through here.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventSeverity, SubscriptionEvent, SyncEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};
