//! Shared helpers for tests that run against a stub collector.

#![allow(dead_code)]

use insight::{Client, Config};
use mockito::ServerGuard;

pub const API_KEY: &str = "test-key";
pub const SERVICE: &str = "checkout";

pub fn client_for(server: &ServerGuard) -> Client {
    Client::new(Config::new(server.url(), API_KEY, SERVICE))
}

/// Body the collector returns from the create endpoints
pub fn created(id: &str) -> String {
    serde_json::json!({ "id": id }).to_string()
}
