pub mod download_sink;
pub mod orchestrator;
pub mod status_reporter;

pub use download_sink::{DownloadSink, SinkConfig};
pub use orchestrator::DownloadOrchestrator;
pub use status_reporter::{FormState, StatusKind};
