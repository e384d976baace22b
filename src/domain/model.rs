use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::Serialize;

use super::error::AppError;

/// Output formats the backend knows how to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum MediaFormat {
    #[serde(rename = "MP3")]
    Mp3,
    #[default]
    #[serde(rename = "MP4")]
    Mp4,
}

impl MediaFormat {
    pub const ALL: [MediaFormat; 2] = [MediaFormat::Mp3, MediaFormat::Mp4];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaFormat::Mp3 => "MP3",
            MediaFormat::Mp4 => "MP4",
        }
    }

    /// Extension used when the backend does not suggest a filename.
    /// The audio variant is delivered as m4a, not re-encoded to mp3.
    pub fn fallback_extension(self) -> &'static str {
        match self {
            MediaFormat::Mp3 => "m4a",
            MediaFormat::Mp4 => "mp4",
        }
    }

    pub fn default_filename(self) -> String {
        format!("video.{}", self.fallback_extension())
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MP3" => Ok(MediaFormat::Mp3),
            "MP4" => Ok(MediaFormat::Mp4),
            other => Err(AppError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A validated submission. Serializes to the backend's request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    url: String,
    format: MediaFormat,
}

impl DownloadRequest {
    /// Validates raw input. The URL is trimmed and must not be empty.
    pub fn new(raw_url: &str, format: MediaFormat) -> Result<Self, AppError> {
        let url = raw_url.trim();
        if url.is_empty() {
            return Err(AppError::EmptyUrl);
        }

        Ok(Self {
            url: url.to_string(),
            format,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn format(&self) -> MediaFormat {
        self.format
    }
}

/// Classified backend answer for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResult {
    Success {
        payload: Bytes,
        suggested_filename: Option<String>,
    },
    Failure {
        message: String,
    },
}

/// Identifier handed back by the download facility once it accepted a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownloadId(pub u64);

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDownload {
    pub filename: String,
    pub download_id: DownloadId,
}

pub type DownloadOutcome = Result<SavedDownload, AppError>;

/// Issued when a request enters flight; completions must present it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Idle,
    InFlight(RequestToken),
    Completed(Completion),
}
