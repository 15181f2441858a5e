use std::fmt;
use std::future::Future;
use std::time::Instant;

use insight_protocol::Metadata;

use crate::client::{Client, ErrorDetails};
use crate::context::Context;

/// An operation wrapped by [`Client::instrument`].
///
/// # Example
///
/// ```no_run
/// # use insight::{Client, Config, Context};
/// # async fn example() -> Result<(), std::io::Error> {
/// let client = Client::new(Config::new("http://localhost:8080", "key", "batch"));
///
/// let process = client.instrument("process_batch", |ctx: Context| async move {
///     // ctx carries the span opened for this call
///     let _ = ctx;
///     Ok::<_, std::io::Error>(())
/// });
///
/// process.call(&Context::new()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Instrumented<F> {
    client: Client,
    operation: String,
    f: F,
}

impl<F> Instrumented<F> {
    pub(crate) fn new(client: Client, operation: String, f: F) -> Self {
        Self {
            client,
            operation,
            f,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Run the wrapped operation.
    ///
    /// A span is opened under `ctx` (when `ctx` is traced and the collector
    /// answers), the operation runs with that span's context, the span is
    /// closed, and exactly one completion log is sent: INFO on success, ERROR
    /// with the failure otherwise. The operation's own result is returned
    /// untouched; telemetry failures never replace it.
    pub async fn call<Fut, T, E>(&self, ctx: &Context) -> Result<T, E>
    where
        F: Fn(Context) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        run(&self.client, &self.operation, ctx, &self.f).await
    }
}

pub(crate) async fn run<F, Fut, T, E>(
    client: &Client,
    operation: &str,
    ctx: &Context,
    f: F,
) -> Result<T, E>
where
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let span_ctx = match client.start_span(ctx, operation).await {
        Ok(span_ctx) => Some(span_ctx),
        Err(err) => {
            tracing::debug!(%err, operation, "running without a span");
            None
        }
    };
    let work_ctx = span_ctx.clone().unwrap_or_else(|| ctx.clone());

    let start = Instant::now();
    let result = f(work_ctx.clone()).await;
    let elapsed = start.elapsed();

    if let Some(span_ctx) = &span_ctx {
        if let Err(err) = client.finish_span(span_ctx).await {
            let details = ErrorDetails::new()
                .error(&err)
                .metadata(operation_metadata(operation, None));
            if let Err(log_err) = client
                .log_error(span_ctx, "Failed to finish span", details)
                .await
            {
                tracing::warn!(%err, %log_err, operation, "could not report span finish failure");
            }
        }
    }

    let metadata = operation_metadata(operation, Some(elapsed.as_millis() as u64));
    let logged = match &result {
        Ok(_) => {
            client
                .log_info(&work_ctx, format!("Operation completed: {operation}"), metadata)
                .await
        }
        Err(err) => {
            let details = ErrorDetails::new().error(err).metadata(metadata);
            client
                .log_error(&work_ctx, format!("Operation failed: {operation}"), details)
                .await
        }
    };
    if let Err(err) = logged {
        tracing::warn!(%err, operation, "could not send completion log");
    }

    result
}

fn operation_metadata(operation: &str, duration_ms: Option<u64>) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("operation".to_string(), operation.into());
    if let Some(duration_ms) = duration_ms {
        metadata.insert("duration_ms".to_string(), duration_ms.into());
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::RecordingTransport;
    use insight_protocol::TraceContext;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn client(transport: &RecordingTransport) -> Client {
        Client::with_transport(Config::new("http://collector", "key", "batch"), transport.clone())
    }

    fn levels(transport: &RecordingTransport) -> Vec<String> {
        transport
            .requests_to("/logs")
            .into_iter()
            .map(|r| r.body.unwrap()["log_level"].as_str().unwrap().to_string())
            .collect()
    }

    fn traced() -> Context {
        Context::new().with_trace(TraceContext::new("t1", "s1"))
    }

    #[tokio::test]
    async fn success_runs_in_a_child_span_and_logs_info() {
        let transport = RecordingTransport::new().with_span_ids(["s2"]);
        let client = client(&transport);

        let process_item = client.instrument("process_item", |ctx: Context| async move {
            Ok::<_, String>(ctx.span_id().cloned())
        });
        assert_eq!(process_item.operation(), "process_item");

        let seen = process_item.call(&traced()).await.unwrap();

        assert_eq!(seen.unwrap().as_str(), "s2");
        assert_eq!(levels(&transport), ["INFO"]);

        let log = transport.requests_to("/logs").remove(0).body.unwrap();
        assert_eq!(log["message"], "Operation completed: process_item");
        assert_eq!(log["span_id"], "s2");
        assert_eq!(log["metadata"]["operation"], "process_item");
        assert!(log["metadata"]["duration_ms"].is_u64());

        assert_eq!(transport.requests_to("/spans/s2/end").len(), 1);
    }

    #[tokio::test]
    async fn failure_logs_one_error_and_returns_it() {
        let transport = RecordingTransport::new();
        let client = client(&transport);

        let err = client
            .instrument("charge_card", |_ctx: Context| async {
                Err::<(), _>("card declined".to_string())
            })
            .call(&traced())
            .await
            .unwrap_err();

        assert_eq!(err, "card declined");
        assert_eq!(levels(&transport), ["ERROR"]);

        let log = transport.requests_to("/logs").remove(0).body.unwrap();
        assert_eq!(log["message"], "Operation failed: charge_card");
        assert_eq!(log["metadata"]["error"], "card declined");
        assert!(log["metadata"]["duration_ms"].is_u64());
    }

    #[tokio::test]
    async fn untraced_context_still_runs_once_and_logs_once() {
        let transport = RecordingTransport::new();
        let client = client(&transport);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        client
            .instrument("cleanup", move |ctx: Context| {
                let counter = counter.clone();
                async move {
                    assert!(!ctx.is_traced());
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                }
            })
            .call(&Context::new())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].path, "/logs");
        assert_eq!(levels(&transport), ["INFO"]);
    }

    #[tokio::test]
    async fn span_start_failure_keeps_the_callers_context() {
        let transport = RecordingTransport::new().failing("/spans", 500);
        let client = client(&transport);
        let parent = traced();

        let seen = client
            .in_span(&parent, "lookup", |ctx| async move {
                Ok::<_, String>(ctx)
            })
            .await
            .unwrap();

        assert_eq!(seen, parent);
        // The parent span must not be closed on the child's behalf.
        assert!(transport.requests_to("/spans/s1/end").is_empty());
        assert_eq!(levels(&transport), ["INFO"]);
    }

    #[tokio::test]
    async fn finish_failure_is_logged_but_not_returned() {
        let transport = RecordingTransport::new()
            .with_span_ids(["s2"])
            .failing("/spans/s2/end", 502);
        let client = client(&transport);

        let value = client
            .in_span(&traced(), "render", |_ctx| async { Ok::<_, String>(42) })
            .await
            .unwrap();

        assert_eq!(value, 42);
        let logs = transport.requests_to("/logs");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].body.as_ref().unwrap()["message"], "Failed to finish span");
        assert_eq!(logs[1].body.as_ref().unwrap()["message"], "Operation completed: render");
    }

    #[tokio::test]
    async fn collector_outage_does_not_change_the_result() {
        let transport = RecordingTransport::new()
            .failing("/spans", 503)
            .failing("/logs", 503);
        let client = client(&transport);

        let result = client
            .in_span(&traced(), "work", |_ctx| async { Err::<(), _>("boom".to_string()) })
            .await;

        assert_eq!(result, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn nested_operations_form_a_chain() {
        let transport = RecordingTransport::new().with_span_ids(["outer", "inner"]);
        let client = client(&transport);

        let inner = client.instrument("inner", |ctx: Context| async move {
            Ok::<_, String>(ctx.span_id().cloned())
        });
        let outer = client.instrument("outer", |ctx: Context| {
            let inner = inner.clone();
            async move { inner.call(&ctx).await }
        });

        let innermost = outer.call(&traced()).await.unwrap();
        assert_eq!(innermost.unwrap().as_str(), "inner");

        let spans = transport.requests_to("/spans");
        assert_eq!(spans[0].body.as_ref().unwrap()["parent_id"], "s1");
        assert_eq!(spans[1].body.as_ref().unwrap()["parent_id"], "outer");

        let ends: Vec<_> = transport
            .requests()
            .into_iter()
            .filter(|r| r.path.ends_with("/end"))
            .map(|r| r.path)
            .collect();
        assert_eq!(ends, ["/spans/inner/end", "/spans/outer/end"]);
        assert_eq!(levels(&transport), ["INFO", "INFO"]);
    }
}
