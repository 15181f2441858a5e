//! In-memory collector used by the unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::Transport;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Recorded {
    pub path: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Default)]
struct State {
    requests: Vec<Recorded>,
    trace_ids: VecDeque<String>,
    span_ids: VecDeque<String>,
    failures: HashMap<String, u16>,
    responses: HashMap<String, Vec<u8>>,
    next_id: u64,
}

/// Records every request and answers like a healthy collector unless told
/// otherwise.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    state: Arc<Mutex<State>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace_ids<'a>(self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.state
            .lock()
            .unwrap()
            .trace_ids
            .extend(ids.into_iter().map(String::from));
        self
    }

    pub fn with_span_ids<'a>(self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.state
            .lock()
            .unwrap()
            .span_ids
            .extend(ids.into_iter().map(String::from));
        self
    }

    /// Answer requests to `path` with `status`
    pub fn failing(self, path: &str, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(path.to_string(), status);
        self
    }

    /// Answer requests to `path` with a fixed 2xx body
    pub fn responding(self, path: &str, body: Vec<u8>) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(path.to_string(), body);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Wait until at least `count` requests arrived, for work done in detached tasks
    pub async fn wait_for(&self, count: usize) -> Vec<Recorded> {
        for _ in 0..200 {
            let requests = self.requests();
            if requests.len() >= count {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.requests()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post(&self, path: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();

        let body = body.map(|b| serde_json::from_slice(&b).expect("client sent invalid JSON"));
        state.requests.push(Recorded {
            path: path.to_string(),
            body,
        });

        if let Some(status) = state.failures.get(path) {
            return Err(Error::Status(*status));
        }
        if let Some(response) = state.responses.get(path) {
            return Ok(response.clone());
        }

        state.next_id += 1;
        let fallback = state.next_id;
        let id = match path {
            "/traces" => state
                .trace_ids
                .pop_front()
                .unwrap_or_else(|| format!("trace-{fallback}")),
            "/spans" => state
                .span_ids
                .pop_front()
                .unwrap_or_else(|| format!("span-{fallback}")),
            _ => return Ok(b"{}".to_vec()),
        };

        Ok(serde_json::to_vec(&serde_json::json!({ "id": id })).unwrap())
    }
}
