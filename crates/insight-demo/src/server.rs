//! An axum service with automatic request instrumentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use insight::{Client, Context, ErrorDetails, Metadata};
use serde_json::json;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tower_http::trace::TraceLayer;

pub async fn run(client: Client, host: &str, port: u16) -> anyhow::Result<()> {
    let app = router(client.clone());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Example service listening on http://{}", addr);

    let mut metadata = Metadata::new();
    metadata.insert("port".into(), port.into());
    if let Err(err) = client
        .log_info(&Context::new(), "Starting axum server", metadata)
        .await
    {
        tracing::warn!("Collector not reachable yet: {}", err);
    }

    axum::serve(listener, app).await?;
    Ok(())
}

fn router(client: Client) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user))
        .route("/error", get(fail))
        .route("/process", get(process))
        .route("/health", get(health))
        .layer(axum::middleware::from_fn_with_state(
            client.clone(),
            insight::axum::track,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(client)
}

fn meta(value: serde_json::Value) -> Metadata {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

async fn list_users(State(client): State<Client>, ctx: Context) -> impl IntoResponse {
    let _ = client
        .log_info(&ctx, "Fetching users list", meta(json!({ "page": 1, "per_page": 10 })))
        .await;

    tokio::time::sleep(Duration::from_millis(75)).await;

    Json(json!({
        "users": [
            { "id": 1, "name": "Alice", "email": "alice@example.com" },
            { "id": 2, "name": "Bob", "email": "bob@example.com" },
        ],
        "total": 2,
    }))
}

async fn create_user(State(client): State<Client>, ctx: Context) -> impl IntoResponse {
    // Work still happens when a span can't be opened; only the span is skipped.
    if let Ok(span) = client.start_span(&ctx, "validate_user_input").await {
        let _ = client.log_info(&span, "Validating user input", None).await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        let _ = client.finish_span(&span).await;
    }

    if let Ok(span) = client.start_span(&ctx, "create_user_in_db").await {
        let _ = client
            .log_info(&span, "Creating user in database", meta(json!({ "table": "users" })))
            .await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        let _ = client.finish_span(&span).await;
    }

    (
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "user_id": 123 })),
    )
}

async fn get_user(
    State(client): State<Client>,
    ctx: Context,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let _ = client
        .log_info(&ctx, "Fetching specific user", meta(json!({ "user_id": user_id })))
        .await;

    tokio::time::sleep(Duration::from_millis(30)).await;

    Json(json!({ "id": user_id, "name": "John Doe", "email": "john@example.com" }))
}

async fn fail(State(client): State<Client>, ctx: Context) -> impl IntoResponse {
    let details = ErrorDetails::from(meta(json!({
        "error_type": "SIMULATION",
        "severity": "high",
    })));
    let _ = client
        .log_error(&ctx, "Simulated error occurred", details)
        .await;

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error", "message": "Something went wrong" })),
    )
}

async fn process(State(client): State<Client>, ctx: Context) -> impl IntoResponse {
    let task_client = client.clone();
    let outcome = client
        .in_span(&ctx, "background_processing", |ctx| async move {
            let _ = task_client.log_info(&ctx, "Starting background task", None).await;

            for step in 1..=3 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let _ = task_client
                    .log_debug(&ctx, "Processing step completed", meta(json!({ "step": step })))
                    .await;
            }

            let _ = task_client.log_info(&ctx, "Background task completed", None).await;
            Ok::<_, anyhow::Error>(())
        })
        .await;

    match outcome {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "completed", "message": "Background processing finished" })),
        ),
        Err(err) => {
            let _ = client
                .log_error(&ctx, "Background task failed", ErrorDetails::new().error(&err))
                .await;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
        }
    }
}

async fn health() -> impl IntoResponse {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    Json(json!({
        "status": "healthy",
        "service": "axum-example-service",
        "timestamp": timestamp,
    }))
}
