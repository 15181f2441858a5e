use serde::{Deserialize, Serialize};
use std::fmt;

/// Collector-assigned trace identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(pub String);

/// Collector-assigned span identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpanId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(TraceId);
string_id!(SpanId);

/// The trace currently in effect for a unit of work.
///
/// `span_id` is the most recently started span that has not been finished yet.
/// Starting a child span never changes an existing `TraceContext`; it produces a
/// new one with the same `trace_id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TraceContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
}

impl TraceContext {
    pub fn new(trace_id: impl Into<TraceId>, span_id: impl Into<SpanId>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
        }
    }

    /// Same trace, new current span
    pub fn child(&self, span_id: SpanId) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id,
        }
    }
}
