use insight_protocol::{Span, SpanId, Trace, TraceContext, TraceId};

use crate::client::Client;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::transport;

/// Trace and span lifecycle.
///
/// Spans nest through context values: `start_span` hands back a new context
/// whose current span is the child, and `finish_span` closes the current span
/// of whatever context it is given. Finishing in reverse order of starting is
/// up to the caller.
impl Client {
    /// Start a trace with a root span named `operation`.
    ///
    /// On success returns a context carrying the new trace, plus the trace
    /// itself. On failure `ctx` remains the context to keep using: tracing is
    /// unavailable but the work should go on. If the trace was created but the
    /// root span was not, the error is [`Error::RootSpan`] and names the trace.
    pub async fn start_trace(
        &self,
        ctx: &Context,
        operation: impl Into<String>,
    ) -> Result<(Context, TraceContext)> {
        let operation = operation.into();

        let trace = Trace::new(self.service_name());
        let trace_id =
            TraceId::new(transport::create(self.transport(), "/traces", &trace, "trace").await?);

        let root = Span::root(trace_id.clone(), self.service_name(), operation.as_str());
        let span_id = match transport::create(self.transport(), "/spans", &root, "span").await {
            Ok(id) => SpanId::new(id),
            Err(source) => {
                return Err(Error::RootSpan {
                    trace_id,
                    source: Box::new(source),
                })
            }
        };

        tracing::debug!(%trace_id, %span_id, %operation, "trace started");

        let trace = TraceContext { trace_id, span_id };
        Ok((ctx.with_trace(trace.clone()), trace))
    }

    /// Start a child of the current span of `ctx`.
    ///
    /// `ctx` itself is not changed; the child lives in the returned context.
    pub async fn start_span(&self, ctx: &Context, operation: impl Into<String>) -> Result<Context> {
        let parent = ctx.trace().ok_or(Error::NoTraceContext)?;

        let span = Span::child(
            parent.trace_id.clone(),
            parent.span_id.clone(),
            self.service_name(),
            operation,
        );
        let span_id =
            SpanId::new(transport::create(self.transport(), "/spans", &span, "span").await?);

        tracing::debug!(
            trace_id = %parent.trace_id,
            parent_id = %parent.span_id,
            %span_id,
            "span started"
        );

        Ok(ctx.with_trace(parent.child(span_id)))
    }

    /// Close the current span of `ctx`
    pub async fn finish_span(&self, ctx: &Context) -> Result<()> {
        let trace = ctx.trace().ok_or(Error::NoTraceContext)?;
        transport::send_empty(self.transport(), &format!("/spans/{}/end", trace.span_id)).await
    }

    /// Close the trace of `ctx`
    pub async fn finish_trace(&self, ctx: &Context) -> Result<()> {
        let trace = ctx.trace().ok_or(Error::NoTraceContext)?;
        transport::send_empty(self.transport(), &format!("/traces/{}/end", trace.trace_id)).await
    }
}
