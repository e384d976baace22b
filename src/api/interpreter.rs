use tracing::warn;

use super::client::{ApiError, Result};
use super::models::{BackendResponse, ErrorResponse};
use crate::domain::DownloadResult;
use crate::utils::parse_disposition_filename;

/// Turn a raw /download answer into a `DownloadResult`.
///
/// A body that breaks the backend contract (undecodable error JSON, empty
/// media payload) is an `InvalidResponse` error, not a `Failure`.
pub fn interpret(response: BackendResponse) -> Result<DownloadResult> {
    if response.is_success() {
        if response.body.is_empty() {
            return Err(ApiError::InvalidResponse(format!(
                "status {} with an empty payload",
                response.status
            )));
        }

        let suggested_filename = response
            .content_disposition
            .as_deref()
            .and_then(parse_disposition_filename);

        return Ok(DownloadResult::Success {
            payload: response.body,
            suggested_filename,
        });
    }

    let error: ErrorResponse = serde_json::from_slice(&response.body).map_err(|e| {
        warn!(status = response.status, "undecodable error body: {}", e);
        ApiError::InvalidResponse(format!(
            "status {} with undecodable error body: {}",
            response.status, e
        ))
    })?;

    Ok(DownloadResult::Failure {
        message: error.error,
    })
}
