//! Framework-agnostic `tower` layer for `http` services.
//!
//! Works with anything built on `tower::Service<http::Request<_>>`: hyper
//! services, tonic servers, axum routers.
//!
//! ```no_run
//! # use insight::{Client, Config, InsightLayer};
//! # fn wrap<S>(service: S) -> insight::InsightService<S> {
//! use tower::Layer;
//!
//! let client = Client::new(Config::new("http://localhost:8080", "key", "orders"));
//! InsightLayer::new(client).layer(service)
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use ::tower::{Layer, Service};
use http::{Request, Response};
use insight_protocol::MetricSource;

use super::{RequestTelemetry, SDK_VERSION};
use crate::client::Client;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Wraps services in [`InsightService`]
#[derive(Clone, Debug)]
pub struct InsightLayer {
    client: Client,
}

impl InsightLayer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl<S> Layer<S> for InsightLayer {
    type Service = InsightService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InsightService {
            inner,
            client: self.client.clone(),
        }
    }
}

/// Traces every request and reports a metric and a completion log for it.
///
/// The request path is used as-is; there is no route template at this level.
/// An error from the inner service is reported as status 500.
#[derive(Clone, Debug)]
pub struct InsightService<S> {
    inner: S,
    client: Client,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for InsightService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let client = self.client.clone();

        Box::pin(async move {
            let method = request.method().as_str().to_owned();
            let path = request.uri().path().to_owned();

            let telemetry = RequestTelemetry::begin(
                &client,
                &method,
                &path,
                request.headers(),
                MetricSource::rust("tower", SDK_VERSION),
            )
            .await;
            telemetry.attach(request.extensions_mut());

            let result = inner.call(request).await;
            let status = match &result {
                Ok(response) => response.status().as_u16(),
                Err(_) => 500,
            };
            telemetry.complete(status);
            result
        })
    }
}
