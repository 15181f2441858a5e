use serde::{Deserialize, Serialize};
use std::fmt;

use crate::trace_context::{SpanId, TraceId};
use crate::Metadata;

/// Severity of a log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Level for a request that completed with `status`
    pub fn for_status(status: u16) -> Self {
        match status {
            400.. => LogLevel::Error,
            300..=399 => LogLevel::Warn,
            _ => LogLevel::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log line sent to `POST /logs`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub service_name: String,
    pub log_level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<TraceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<SpanId>,
    #[serde(default, skip_serializing_if = "is_empty_metadata")]
    pub metadata: Option<Metadata>,
}

/// Framework that produced a metric
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSource {
    pub language: String,
    pub framework: String,
    pub version: String,
}

impl MetricSource {
    /// A Rust source for `framework`
    pub fn rust(framework: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            language: "rust".to_string(),
            framework: framework.into(),
            version: version.into(),
        }
    }
}

/// A request performance sample sent to `POST /metrics`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Left empty to let the client fill in its own service name
    #[serde(default)]
    pub service_name: String,
    pub path: String,
    pub method: String,
    pub status_code: u16,
    /// Fractional milliseconds
    #[serde(rename = "duration_ms")]
    pub duration: f64,
    pub source: MetricSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_metadata")]
    pub metadata: Option<Metadata>,
}

fn is_empty_metadata(metadata: &Option<Metadata>) -> bool {
    metadata.as_ref().map_or(true, |m| m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn level_follows_status_class() {
        assert_eq!(LogLevel::for_status(200), LogLevel::Info);
        assert_eq!(LogLevel::for_status(204), LogLevel::Info);
        assert_eq!(LogLevel::for_status(301), LogLevel::Warn);
        assert_eq!(LogLevel::for_status(404), LogLevel::Error);
        assert_eq!(LogLevel::for_status(503), LogLevel::Error);
    }

    #[test]
    fn levels_are_upper_case_on_the_wire() {
        assert_eq!(serde_json::to_value(LogLevel::Warn).unwrap(), json!("WARN"));
        assert_eq!(
            serde_json::from_value::<LogLevel>(json!("DEBUG")).unwrap(),
            LogLevel::Debug
        );
    }

    #[test]
    fn unqualified_entry_omits_ids_and_empty_metadata() {
        let entry = LogEntry {
            service_name: "billing".into(),
            log_level: LogLevel::Info,
            message: "hello".into(),
            trace_id: None,
            span_id: None,
            metadata: Some(Metadata::new()),
        };

        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "service_name": "billing",
                "log_level": "INFO",
                "message": "hello",
            })
        );
    }

    #[test]
    fn metric_uses_duration_ms_field() {
        let metric = Metric {
            service_name: "billing".into(),
            path: "/invoices".into(),
            method: "POST".into(),
            status_code: 201,
            duration: 12.5,
            source: MetricSource::rust("axum", "0.1.0"),
            environment: Some("staging".into()),
            request_id: None,
            metadata: None,
        };

        let value = serde_json::to_value(&metric).unwrap();
        assert_eq!(value["duration_ms"], json!(12.5));
        assert_eq!(value["source"]["language"], "rust");
        assert_eq!(value["environment"], "staging");
        assert!(value.get("request_id").is_none());
        assert!(value.get("metadata").is_none());
    }
}
