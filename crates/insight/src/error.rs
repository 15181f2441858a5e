use std::time::Duration;

use insight_protocol::TraceId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while talking to the collector.
///
/// None of these are fatal to the application: callers that only want
/// best-effort telemetry can log and drop them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A span or trace operation was called on a context that was never traced.
    #[error("no trace context")]
    NoTraceContext,

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to send request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("collector request failed with status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("collector returned an empty {0} id")]
    EmptyId(&'static str),

    /// The trace was created but its root span was not.
    #[error("trace {trace_id} started but its root span failed: {source}")]
    RootSpan {
        trace_id: TraceId,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// True for failures to reach the collector or get a 2xx out of it
    pub fn is_delivery(&self) -> bool {
        matches!(self, Error::Request(_) | Error::Timeout(_) | Error::Status(_))
    }

    /// Trace that was left without a root span, if any
    pub fn orphaned_trace(&self) -> Option<&TraceId> {
        match self {
            Error::RootSpan { trace_id, .. } => Some(trace_id),
            _ => None,
        }
    }
}
