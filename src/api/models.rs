use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Body of every non-2xx answer from /download; other fields are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response from the /health endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Raw answer from /download, fully read.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: u16,
    pub content_disposition: Option<String>,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Configuration for the API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub backend_url: String,
    pub connect_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000/".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
