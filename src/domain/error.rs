use thiserror::Error;

/// Terminal failures of a single download request. `Display` is the text
/// shown to the user; the `detail` fields only go to the logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Please enter a YouTube URL")]
    EmptyUrl,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot connect to backend. Make sure the server is running!")]
    Network { detail: String },

    #[error("Error: {0}")]
    Server(String),

    #[error("Unexpected response from backend")]
    Protocol { detail: String },

    #[error("Download failed")]
    Sink { detail: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    /// Diagnostic context that is not shown to the user.
    pub fn detail(&self) -> Option<&str> {
        match self {
            AppError::Network { detail }
            | AppError::Protocol { detail }
            | AppError::Sink { detail } => Some(detail),
            _ => None,
        }
    }
}
