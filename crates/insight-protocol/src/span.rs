use serde::{Deserialize, Serialize};

use crate::trace_context::{SpanId, TraceId};

/// Trace creation request (`POST /traces`)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TraceId>,
    pub service_name: String,
}

impl Trace {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            id: None,
            service_name: service_name.into(),
        }
    }
}

/// Span creation request (`POST /spans`)
///
/// `parent_id` is absent only for the root span of a trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SpanId>,
    pub trace_id: TraceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SpanId>,
    pub service: String,
    pub operation: String,
}

impl Span {
    /// Root span of `trace_id`
    pub fn root(
        trace_id: TraceId,
        service: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            trace_id,
            parent_id: None,
            service: service.into(),
            operation: operation.into(),
        }
    }

    /// Child of `parent_id` within `trace_id`
    pub fn child(
        trace_id: TraceId,
        parent_id: SpanId,
        service: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            trace_id,
            parent_id: Some(parent_id),
            service: service.into(),
            operation: operation.into(),
        }
    }
}

/// Response body of the two create operations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Created {
    pub id: String,
}
