pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{
    Completion, DownloadId, DownloadOutcome, DownloadRequest, DownloadResult, MediaFormat,
    RequestToken, SavedDownload, UiState,
};
