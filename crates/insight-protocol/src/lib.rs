//! Protocol definitions for the Insight collector.
//!
//! This crate defines the JSON payloads exchanged with the collector's HTTP API,
//! along with the identifiers that tie logs, spans and traces together.

mod span;
mod telemetry;
mod trace_context;

pub use span::*;
pub use telemetry::*;
pub use trace_context::*;

/// Free-form structured metadata attached to logs and metrics.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
