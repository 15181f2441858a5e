//! axum integration.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use insight::{Client, Config, Context};
//!
//! async fn list_users(ctx: Context) -> &'static str {
//!     // ctx carries the request's trace
//!     let _ = ctx;
//!     "[]"
//! }
//!
//! # fn app() -> Router {
//! let client = Client::new(Config::new("http://localhost:8080", "key", "users"));
//! Router::new()
//!     .route("/users", get(list_users))
//!     .layer(axum::middleware::from_fn_with_state(client, insight::axum::track))
//! # }
//! ```

use std::convert::Infallible;

use ::axum::async_trait;
use ::axum::extract::{FromRequestParts, MatchedPath, Request, State};
use ::axum::middleware::Next;
use ::axum::response::Response;
use http::request::Parts;
use insight_protocol::MetricSource;

use super::{RequestTelemetry, SDK_VERSION};
use crate::client::Client;
use crate::context::Context;

/// Middleware for `axum::middleware::from_fn_with_state`.
///
/// Traces the request under its route template (`/users/:id`), or its raw
/// path when no route matched.
pub async fn track(State(client): State<Client>, mut request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let telemetry = RequestTelemetry::begin(
        &client,
        request.method().as_str(),
        &path,
        request.headers(),
        MetricSource::rust("axum", SDK_VERSION),
    )
    .await;
    telemetry.attach(request.extensions_mut());

    let response = next.run(request).await;
    telemetry.complete(response.status().as_u16());
    response
}

/// Handlers can take the request [`Context`] directly.
///
/// Outside of [`track`] this yields an untraced context.
#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Context>().cloned().unwrap_or_default())
    }
}
