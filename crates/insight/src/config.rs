use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client configuration.
///
/// `endpoint`, `api_key` and `service_name` are required. They are not checked
/// up front: a bad endpoint or key shows up as a delivery error on the first call.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    /// Collector base URL, e.g. `http://localhost:8080`
    pub endpoint: String,
    pub service_name: String,
    /// Per-request timeout. Zero means [`DEFAULT_TIMEOUT`].
    pub timeout: Duration,
}

impl Config {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            service_name: service_name.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the configuration from `INSIGHT_*` environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `INSIGHT_ENDPOINT` | `http://localhost:8080` |
    /// | `INSIGHT_API_KEY` | empty |
    /// | `INSIGHT_SERVICE_NAME` | `unknown` |
    /// | `INSIGHT_TIMEOUT_MS` | 5000 |
    pub fn from_env() -> Self {
        let endpoint = std::env::var("INSIGHT_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let api_key = std::env::var("INSIGHT_API_KEY").unwrap_or_default();
        let service_name =
            std::env::var("INSIGHT_SERVICE_NAME").unwrap_or_else(|_| "unknown".to_string());

        let timeout = match std::env::var("INSIGHT_TIMEOUT_MS") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    tracing::warn!(value = %raw, "ignoring invalid INSIGHT_TIMEOUT_MS");
                    DEFAULT_TIMEOUT
                }
            },
            Err(_) => DEFAULT_TIMEOUT,
        };

        Self {
            api_key,
            endpoint,
            service_name,
            timeout,
        }
    }

    pub(crate) fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(String::new(), String::new(), String::new())
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("service_name", &self.service_name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let config = Config::new("http://collector", "key", "svc").with_timeout(Duration::ZERO);
        assert_eq!(config.effective_timeout(), DEFAULT_TIMEOUT);

        let config = config.with_timeout(Duration::from_millis(250));
        assert_eq!(config.effective_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = Config::new("http://collector", "super-secret", "svc");
        let printed = format!("{config:?}");
        assert!(printed.contains("http://collector"));
        assert!(!printed.contains("super-secret"));
    }
}
