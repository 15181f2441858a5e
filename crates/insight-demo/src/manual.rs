//! Manual instrumentation patterns: explicit traces and spans, wrapped
//! functions, error reporting and custom metrics.

use insight::{Client, Context, ErrorDetails, Metadata, Metric, MetricSource};
use serde_json::json;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("user validation failed")]
    InvalidUser,

    #[error("simulated operation failure")]
    Simulated,

    #[error("failed to process item {item}: {source}")]
    Item {
        item: String,
        #[source]
        source: Box<DemoError>,
    },
}

fn meta(value: serde_json::Value) -> Metadata {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

/// Cheap jitter for simulated latencies
fn jitter(max_ms: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or_default();
    nanos % max_ms.max(1)
}

/// Opens one span per step by hand
struct UserService {
    client: Client,
}

impl UserService {
    async fn process_user(&self, ctx: &Context, user_id: &str) -> Result<(), DemoError> {
        let span = match self.client.start_span(ctx, "process_user").await {
            Ok(span) => span,
            Err(err) => {
                tracing::warn!("Continuing without a span: {}", err);
                ctx.clone()
            }
        };

        let _ = self
            .client
            .log_info(&span, "Starting user processing", meta(json!({ "user_id": user_id })))
            .await;

        let result = self.run_steps(&span, user_id).await;

        if result.is_ok() {
            let _ = self
                .client
                .log_info(
                    &span,
                    "User processing completed successfully",
                    meta(json!({ "user_id": user_id, "steps": 3 })),
                )
                .await;
        }

        if span.span_id() != ctx.span_id() {
            let _ = self.client.finish_span(&span).await;
        }
        result
    }

    async fn run_steps(&self, ctx: &Context, user_id: &str) -> Result<(), DemoError> {
        self.step(ctx, "validate_user", 50, || {
            if user_id == "invalid" {
                Err(DemoError::InvalidUser)
            } else {
                Ok(())
            }
        })
        .await?;

        let query_ms = 50 + jitter(100);
        self.step(ctx, "fetch_user_data", query_ms, || Ok(())).await?;
        self.step(ctx, "save_processed_results", 75, || Ok(())).await
    }

    async fn step(
        &self,
        ctx: &Context,
        name: &str,
        millis: u64,
        check: impl FnOnce() -> Result<(), DemoError>,
    ) -> Result<(), DemoError> {
        let opened = self.client.start_span(ctx, name).await.ok();
        let span = opened.clone().unwrap_or_else(|| ctx.clone());

        let _ = self
            .client
            .log_debug(&span, format!("Running {name}"), meta(json!({ "expected_ms": millis })))
            .await;
        tokio::time::sleep(Duration::from_millis(millis)).await;

        let result = check();
        if let Err(err) = &result {
            let details = ErrorDetails::new()
                .error(err)
                .metadata(meta(json!({ "step": name })));
            let _ = self.client.log_error(&span, format!("{name} failed"), details).await;
        }

        if let Some(span) = &opened {
            let _ = self.client.finish_span(span).await;
        }
        result
    }
}

/// Uses the function wrapper instead of explicit spans
async fn process_batch(client: &Client, ctx: &Context, items: &[&str]) -> Result<(), DemoError> {
    let outer = client.clone();
    client
        .in_span(ctx, "process_batch", |ctx| async move {
            let _ = outer
                .log_info(
                    &ctx,
                    "Starting batch processing",
                    meta(json!({ "batch_size": items.len() })),
                )
                .await;

            for (position, item) in items.iter().enumerate() {
                let inner = outer.clone();
                let process_item = outer.instrument("process_item", move |ctx: Context| {
                    let inner = inner.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(25 + jitter(50))).await;
                        let _ = inner
                            .log_debug(
                                &ctx,
                                "Processed item",
                                meta(json!({ "item": item, "position": position + 1 })),
                            )
                            .await;
                        Ok::<_, DemoError>(())
                    }
                });

                process_item
                    .call(&ctx)
                    .await
                    .map_err(|err| DemoError::Item {
                        item: item.to_string(),
                        source: Box::new(err),
                    })?;
            }

            let _ = outer
                .log_info(
                    &ctx,
                    "Batch processing completed",
                    meta(json!({ "processed_count": items.len() })),
                )
                .await;
            Ok::<_, DemoError>(())
        })
        .await
}

pub async fn run(client: Client) -> anyhow::Result<()> {
    let background = Context::new();

    println!("=== Example 1: Manual Trace Management ===");

    let (ctx, trace) = client.start_trace(&background, "user_workflow").await?;
    let _ = client
        .log_info(&ctx, "Starting user workflow demonstration", None)
        .await;

    let users = UserService {
        client: client.clone(),
    };
    if let Err(err) = users.process_user(&ctx, "user123").await {
        let _ = client
            .log_error(&ctx, "User processing failed", ErrorDetails::new().error(&err))
            .await;
    }

    let _ = client.finish_span(&ctx).await;
    let _ = client.finish_trace(&ctx).await;
    let _ = client
        .log_info(
            &background,
            "Trace completed",
            meta(json!({ "trace_id": trace.trace_id })),
        )
        .await;

    println!("\n=== Example 2: Function Decoration ===");

    let items = ["item1", "item2", "item3", "item4", "item5"];
    if let Err(err) = process_batch(&client, &background, &items).await {
        let _ = client
            .log_error(&background, "Batch processing failed", ErrorDetails::new().error(&err))
            .await;
    }

    println!("\n=== Example 3: Error Handling ===");

    let task_client = client.clone();
    let demo = client.instrument("error_handling_demo", move |ctx: Context| {
        let client = task_client.clone();
        async move {
            let _ = client.log_info(&ctx, "Demonstrating error handling", None).await;
            // Roughly a 30% failure rate
            if jitter(10) >= 7 {
                return Err(DemoError::Simulated);
            }
            let _ = client.log_info(&ctx, "Operation completed successfully", None).await;
            Ok::<_, DemoError>(())
        }
    });
    if let Err(err) = demo.call(&background).await {
        tracing::info!(operation = demo.operation(), %err, "wrapped operation failed");
        let _ = client
            .log_error(&background, "Operation failed as expected", ErrorDetails::new().error(&err))
            .await;
    }

    println!("\n=== Example 4: Custom Metrics ===");

    let metric = Metric {
        service_name: String::new(),
        path: "/batch/process".into(),
        method: "POST".into(),
        status_code: 200,
        duration: 250.5,
        source: MetricSource::rust("manual", "1.0.0"),
        environment: Some("development".into()),
        request_id: None,
        metadata: Some(meta(json!({ "batch_size": items.len(), "success": true }))),
    };
    match client.send_metric(metric).await {
        Ok(()) => {
            let _ = client
                .log_info(&background, "Custom metric sent successfully", None)
                .await;
        }
        Err(err) => {
            let _ = client
                .log_error(
                    &background,
                    "Failed to send custom metric",
                    ErrorDetails::new().error(&err),
                )
                .await;
        }
    }

    println!("\n=== Manual Instrumentation Examples Completed ===");
    Ok(())
}
