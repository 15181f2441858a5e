use std::fmt;
use std::future::Future;
use std::sync::Arc;

use insight_protocol::{LogEntry, LogLevel, Metadata, Metric};

use crate::config::Config;
use crate::context::Context;
use crate::error::Result;
use crate::instrument::{self, Instrumented};
use crate::transport::{self, HttpTransport, Transport};

/// Metadata key that carries the error text of an ERROR log
pub const ERROR_KEY: &str = "error";

/// Main entry point for sending telemetry.
///
/// Cloning is cheap and every clone talks to the same collector. A `Client`
/// holds no per-call state, so it can be shared freely between tasks.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Config,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Build a client that talks HTTP to `config.endpoint`.
    ///
    /// Nothing is sent until the first telemetry call.
    pub fn new(config: Config) -> Self {
        let transport = HttpTransport::new(&config);
        Self::with_transport(config, transport)
    }

    /// Build a client on top of a custom [`Transport`].
    ///
    /// A zero timeout is reported as the default, as with [`Client::new`].
    pub fn with_transport<T: Transport>(mut config: Config, transport: T) -> Self {
        config.timeout = config.effective_timeout();
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport: Arc::new(transport),
            }),
        }
    }

    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn service_name(&self) -> &str {
        &self.inner.config.service_name
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    /// Send a log entry, tagged with the trace and span of `ctx` when it has one
    pub async fn log(
        &self,
        ctx: &Context,
        level: LogLevel,
        message: impl Into<String>,
        metadata: impl Into<Option<Metadata>>,
    ) -> Result<()> {
        let entry = LogEntry {
            service_name: self.service_name().to_string(),
            log_level: level,
            message: message.into(),
            trace_id: ctx.trace_id().cloned(),
            span_id: ctx.span_id().cloned(),
            metadata: metadata.into(),
        };

        tracing::debug!(level = %entry.log_level, traced = ctx.is_traced(), "sending log");
        transport::send(self.transport(), "/logs", &entry).await
    }

    pub async fn log_info(
        &self,
        ctx: &Context,
        message: impl Into<String>,
        metadata: impl Into<Option<Metadata>>,
    ) -> Result<()> {
        self.log(ctx, LogLevel::Info, message, metadata).await
    }

    pub async fn log_warn(
        &self,
        ctx: &Context,
        message: impl Into<String>,
        metadata: impl Into<Option<Metadata>>,
    ) -> Result<()> {
        self.log(ctx, LogLevel::Warn, message, metadata).await
    }

    pub async fn log_debug(
        &self,
        ctx: &Context,
        message: impl Into<String>,
        metadata: impl Into<Option<Metadata>>,
    ) -> Result<()> {
        self.log(ctx, LogLevel::Debug, message, metadata).await
    }

    /// Send an ERROR log.
    ///
    /// The error text in `details`, if any, ends up in the metadata under
    /// [`ERROR_KEY`].
    ///
    /// ```no_run
    /// # use insight::{Client, Context, ErrorDetails, Metadata};
    /// # async fn example(client: Client, ctx: Context, err: std::io::Error) {
    /// let mut metadata = Metadata::new();
    /// metadata.insert("user_id".into(), "123".into());
    ///
    /// let _ = client
    ///     .log_error(
    ///         &ctx,
    ///         "Saving user failed",
    ///         ErrorDetails::new().error(&err).metadata(metadata),
    ///     )
    ///     .await;
    /// # }
    /// ```
    pub async fn log_error(
        &self,
        ctx: &Context,
        message: impl Into<String>,
        details: ErrorDetails,
    ) -> Result<()> {
        self.log(ctx, LogLevel::Error, message, details.into_metadata())
            .await
    }

    /// Send a metric, filling in this client's service name if it is blank
    pub async fn send_metric(&self, mut metric: Metric) -> Result<()> {
        if metric.service_name.is_empty() {
            metric.service_name = self.service_name().to_string();
        }

        tracing::debug!(path = %metric.path, status = metric.status_code, "sending metric");
        transport::send(self.transport(), "/metrics", &metric).await
    }

    /// Wrap `f` so every call runs in its own span and ends with a completion log.
    ///
    /// See [`Instrumented::call`].
    pub fn instrument<F>(&self, operation: impl Into<String>, f: F) -> Instrumented<F> {
        Instrumented::new(self.clone(), operation.into(), f)
    }

    /// Run `f` once the way [`Client::instrument`] would
    pub async fn in_span<F, Fut, T, E>(&self, ctx: &Context, operation: &str, f: F) -> Result<T, E>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        instrument::run(self, operation, ctx, f).await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// The optional error and metadata of an ERROR log.
///
/// Each can be set once; later calls for an already-set field are ignored, so
/// the order in which the two are added does not matter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorDetails {
    error: Option<String>,
    metadata: Option<Metadata>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(mut self, error: impl fmt::Display) -> Self {
        if self.error.is_none() {
            self.error = Some(error.to_string());
        }
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        if self.metadata.is_none() {
            self.metadata = Some(metadata);
        }
        self
    }

    pub(crate) fn into_metadata(self) -> Metadata {
        let mut metadata = self.metadata.unwrap_or_default();
        if let Some(error) = self.error {
            metadata.insert(ERROR_KEY.to_string(), error.into());
        }
        metadata
    }
}

impl From<Metadata> for ErrorDetails {
    fn from(metadata: Metadata) -> Self {
        Self::new().metadata(metadata)
    }
}
