//! Request-scoped trace propagation.

use std::sync::Arc;

use insight_protocol::{SpanId, TraceContext, TraceId};

/// The value threaded through instrumented code to carry the active trace.
///
/// A `Context` is never modified in place. [`Context::with_trace`] returns a new
/// value, so a context handed to one branch of work keeps pointing at the same
/// span no matter what other branches derive from it. Cloning is cheap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Context {
    trace: Option<Arc<TraceContext>>,
}

impl Context {
    /// An untraced context
    pub fn new() -> Self {
        Self::default()
    }

    /// A new context carrying `trace`; `self` is left as it was
    pub fn with_trace(&self, trace: TraceContext) -> Self {
        Self {
            trace: Some(Arc::new(trace)),
        }
    }

    pub fn trace(&self) -> Option<&TraceContext> {
        self.trace.as_deref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace().map(|t| &t.trace_id)
    }

    pub fn span_id(&self) -> Option<&SpanId> {
        self.trace().map(|t| &t.span_id)
    }

    pub fn is_traced(&self) -> bool {
        self.trace.is_some()
    }
}

impl From<TraceContext> for Context {
    fn from(trace: TraceContext) -> Self {
        Context::new().with_trace(trace)
    }
}
