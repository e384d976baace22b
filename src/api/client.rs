use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::interpreter::interpret;
use super::models::{ApiConfig, BackendResponse, HealthResponse};
use crate::domain::{DownloadRequest, DownloadResult};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    download_url: Url,
    health_url: Url,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut base = config.backend_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)?;

        // No overall timeout: conversions routinely take minutes.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            download_url: base.join("download")?,
            health_url: base.join("health")?,
        })
    }

    pub fn download_url(&self) -> &Url {
        &self.download_url
    }

    /// POST the request to /download and read the whole answer.
    ///
    /// Any error here means no usable response was obtained.
    pub async fn dispatch(&self, request: &DownloadRequest) -> Result<BackendResponse> {
        debug!(url = request.url(), format = %request.format(), "dispatching download request");

        let response = self
            .client
            .post(self.download_url.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        info!(status, bytes = body.len(), "backend answered");

        Ok(BackendResponse {
            status,
            content_disposition,
            body,
        })
    }

    /// Dispatch and classify in one step.
    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadResult> {
        let response = self.dispatch(request).await?;
        interpret(response)
    }

    /// GET /health; true only for `{"status": "ok"}`.
    pub async fn health(&self) -> Result<bool> {
        let response = self
            .client
            .get(self.health_url.clone())
            .send()
            .await?
            .error_for_status()?;

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

        Ok(health.status == "ok")
    }
}
