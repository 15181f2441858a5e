//! Client library for sending logs, metrics and spans to an Insight collector.
//!
//! Every call is a single best-effort HTTP request. Traces are carried through
//! your code as a [`Context`] value: start a trace, pass the context down, and
//! derive child contexts with [`Client::start_span`] or [`Client::instrument`].
//!
//! # Example
//!
//! ```no_run
//! use insight::{Client, Config, Context};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), insight::Error> {
//!     let client = Client::new(Config::new("http://localhost:8080", "api-key", "checkout"));
//!
//!     let (ctx, _trace) = client.start_trace(&Context::new(), "user_workflow").await?;
//!     client.log_info(&ctx, "Starting user workflow", None).await?;
//!
//!     let span = client.start_span(&ctx, "validate_user").await?;
//!     // Do work...
//!     client.finish_span(&span).await?;
//!
//!     client.finish_span(&ctx).await?;
//!     client.finish_trace(&ctx).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod context;
mod error;
mod instrument;
mod middleware;
mod tracer;
mod transport;

#[cfg(test)]
mod testing;

pub use client::{Client, ErrorDetails, ERROR_KEY};
pub use config::{Config, DEFAULT_TIMEOUT};
pub use context::Context;
pub use error::{Error, Result};
pub use instrument::Instrumented;
pub use middleware::tower::{InsightLayer, InsightService};
pub use transport::{HttpTransport, Transport, API_KEY_HEADER};
pub use insight_protocol::*;

#[cfg(feature = "axum")]
pub use middleware::axum;
