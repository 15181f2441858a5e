//! Automatic request instrumentation for HTTP servers.
//!
//! Both adapters follow the same lifecycle:
//!
//! ```text
//! request in ──► start_trace("METHOD /path")          (awaited, before the handler)
//!            ──► Context + TraceContext in extensions
//!            ──► handler
//! response   ──► spawn: send metric                   ┐
//!            ──► spawn: send completion log           ├ detached, never awaited
//!            ──► spawn: finish root span, then trace  ┘
//! ```
//!
//! A slow or unreachable collector therefore delays only the trace start of a
//! request, never its response, and a failure in one background task has no
//! effect on the others.

#[cfg(feature = "axum")]
pub mod axum;
pub mod tower;

use std::time::Instant;

use http::{Extensions, HeaderMap};
use insight_protocol::{LogLevel, Metadata, Metric, MetricSource, TraceContext};

use crate::client::Client;
use crate::context::Context;

/// Version reported in the metric source of both adapters
pub(crate) const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request state carried from trace start to the background emissions
pub(crate) struct RequestTelemetry {
    client: Client,
    ctx: Context,
    trace: Option<TraceContext>,
    method: String,
    path: String,
    request_id: Option<String>,
    user_agent: Option<String>,
    source: MetricSource,
    start: Instant,
}

impl RequestTelemetry {
    pub(crate) async fn begin(
        client: &Client,
        method: &str,
        path: &str,
        headers: &HeaderMap,
        source: MetricSource,
    ) -> Self {
        let start = Instant::now();
        let operation = format!("{method} {path}");

        let (ctx, trace) = match client.start_trace(&Context::new(), operation.as_str()).await {
            Ok((ctx, trace)) => (ctx, Some(trace)),
            Err(err) => {
                tracing::warn!(%err, %operation, "tracing unavailable for request");
                (Context::new(), None)
            }
        };

        Self {
            client: client.clone(),
            ctx,
            trace,
            method: method.to_string(),
            path: path.to_string(),
            request_id: header(headers, REQUEST_ID_HEADER),
            user_agent: header(headers, http::header::USER_AGENT.as_str()),
            source,
            start,
        }
    }

    /// Make the request context reachable from handlers.
    ///
    /// The `Context` is always inserted, untraced if the trace could not be
    /// started. The `TraceContext` only exists for traced requests.
    pub(crate) fn attach(&self, extensions: &mut Extensions) {
        extensions.insert(self.ctx.clone());
        if let Some(trace) = &self.trace {
            extensions.insert(trace.clone());
        }
    }

    /// Fire off the metric, completion log and trace finish for a response
    pub(crate) fn complete(self, status: u16) {
        let elapsed = self.start.elapsed();

        let metric = Metric {
            service_name: self.client.service_name().to_string(),
            path: self.path.clone(),
            method: self.method.clone(),
            status_code: status,
            duration: elapsed.as_secs_f64() * 1000.0,
            source: self.source.clone(),
            environment: None,
            request_id: self.request_id.clone(),
            metadata: None,
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(err) = client.send_metric(metric).await {
                tracing::warn!(%err, "failed to send request metric");
            }
        });

        let mut metadata = Metadata::new();
        metadata.insert("method".to_string(), self.method.clone().into());
        metadata.insert("path".to_string(), self.path.clone().into());
        metadata.insert("status_code".to_string(), status.into());
        metadata.insert("duration_ms".to_string(), (elapsed.as_millis() as u64).into());
        metadata.insert(
            "user_agent".to_string(),
            self.user_agent.clone().unwrap_or_default().into(),
        );
        let message = format!("Request completed: {} {}", self.method, self.path);
        let client = self.client.clone();
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            if let Err(err) = client
                .log(&ctx, LogLevel::for_status(status), message, metadata)
                .await
            {
                tracing::warn!(%err, "failed to send request log");
            }
        });

        if self.trace.is_some() {
            let client = self.client;
            let ctx = self.ctx;
            tokio::spawn(async move {
                if let Err(err) = client.finish_span(&ctx).await {
                    tracing::warn!(%err, "failed to finish request span");
                }
                if let Err(err) = client.finish_trace(&ctx).await {
                    tracing::warn!(%err, "failed to finish request trace");
                }
            });
        }
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
