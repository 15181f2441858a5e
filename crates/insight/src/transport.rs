use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::time::Duration;

use insight_protocol::Created;

use crate::config::Config;
use crate::error::{Error, Result};

/// Header carrying the collector API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Delivers one request to the collector.
///
/// Implementations POST `body` (already JSON-encoded) to `path` below the
/// collector endpoint and return the body of a 2xx response. Anything else is an
/// error. There is no retrying or buffering at this level.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn post(&self, path: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>>;
}

/// The default transport: JSON over HTTP via reqwest
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.effective_timeout(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        let mut request = self
            .http
            .post(self.url(path))
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, &self.api_key);

        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(path, status = status.as_u16(), "collector rejected request");
            return Err(Error::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(bytes.to_vec())
    }
}

impl HttpTransport {
    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Request(err)
        }
    }
}

/// POST `body` and ignore whatever comes back
pub(crate) async fn send<B>(transport: &dyn Transport, path: &str, body: &B) -> Result<()>
where
    B: Serialize + ?Sized,
{
    let body = serde_json::to_vec(body).map_err(Error::Encode)?;
    transport.post(path, Some(body)).await?;
    Ok(())
}

/// POST with no body, e.g. to close a span
pub(crate) async fn send_empty(transport: &dyn Transport, path: &str) -> Result<()> {
    transport.post(path, None).await?;
    Ok(())
}

/// POST `body` and decode the `{"id": ...}` the collector assigns
pub(crate) async fn create<B>(
    transport: &dyn Transport,
    path: &str,
    body: &B,
    kind: &'static str,
) -> Result<String>
where
    B: Serialize + ?Sized,
{
    let body = serde_json::to_vec(body).map_err(Error::Encode)?;
    let response = transport.post(path, Some(body)).await?;
    let created: Created = serde_json::from_slice(&response).map_err(Error::Decode)?;
    if created.id.is_empty() {
        return Err(Error::EmptyId(kind));
    }
    Ok(created.id)
}
