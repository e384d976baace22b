use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{info, warn};

use super::download_sink::DownloadSink;
use super::status_reporter::FormState;
use crate::{
    api::{ApiClient, ApiError},
    domain::{
        AppError, DownloadOutcome, DownloadRequest, DownloadResult, RequestToken, SavedDownload,
    },
    utils::resolve_filename,
};

/// A request that passed validation and holds the in-flight slot.
#[derive(Debug, Clone)]
pub struct PendingDownload {
    pub token: RequestToken,
    pub request: DownloadRequest,
}

#[derive(Clone)]
pub struct DownloadOrchestrator {
    api_client: ApiClient,
    sink: DownloadSink,
}

impl DownloadOrchestrator {
    pub fn new(api_client: ApiClient, sink: DownloadSink) -> Self {
        Self { api_client, sink }
    }

    /// Validate the form and claim the request slot.
    ///
    /// Returns `None` when the input is rejected or a request is already in
    /// flight; nothing has been sent in either case.
    pub fn submit(&self, form: &mut FormState) -> Option<PendingDownload> {
        if !form.reporter.trigger_enabled() {
            return None;
        }

        let request = match DownloadRequest::new(&form.url_input, form.format) {
            Ok(request) => request,
            Err(e) => {
                form.reporter.reject(&e);
                return None;
            }
        };

        let token = form.reporter.begin()?;
        Some(PendingDownload { token, request })
    }

    /// Run dispatch, interpretation and saving. Never fails outward: a panic
    /// anywhere in the chain becomes `AppError::Unexpected`.
    pub async fn execute(&self, request: DownloadRequest) -> DownloadOutcome {
        let outcome = AssertUnwindSafe(self.run(&request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(AppError::Unexpected(panic_message(panic))));

        match &outcome {
            Ok(saved) => info!(
                url = request.url(),
                filename = %saved.filename,
                id = %saved.download_id,
                "download completed"
            ),
            Err(e) => warn!(
                url = request.url(),
                detail = e.detail().unwrap_or_default(),
                "download failed: {}",
                e
            ),
        }
        outcome
    }

    /// Apply an outcome to the form. The input is cleared only on success.
    pub fn finish(form: &mut FormState, token: RequestToken, outcome: &DownloadOutcome) {
        if form.reporter.complete(token, outcome) && outcome.is_ok() {
            form.url_input.clear();
        }
    }

    async fn run(&self, request: &DownloadRequest) -> DownloadOutcome {
        let result = self
            .api_client
            .download(request)
            .await
            .map_err(into_app_error)?;

        let (payload, suggested_filename) = match result {
            DownloadResult::Success {
                payload,
                suggested_filename,
            } => (payload, suggested_filename),
            DownloadResult::Failure { message } => return Err(AppError::Server(message)),
        };

        let filename = resolve_filename(suggested_filename.as_deref(), request.format());
        let download_id = self.sink.save(payload, &filename).await?;

        Ok(SavedDownload {
            filename,
            download_id,
        })
    }
}

fn into_app_error(error: ApiError) -> AppError {
    match error {
        ApiError::RequestError(e) => AppError::Network {
            detail: e.to_string(),
        },
        ApiError::InvalidUrl(e) => AppError::Network {
            detail: e.to_string(),
        },
        ApiError::InvalidResponse(detail) => AppError::Protocol { detail },
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic in download task".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;
    use crate::application::download_sink::tests::RecordingFacility;
    use crate::application::download_sink::{
        DownloadFacility, DownloadOptions, HandleRegistry, SinkConfig,
    };
    use crate::application::status_reporter::StatusKind;
    use crate::domain::{Completion, DownloadId, MediaFormat, UiState};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    struct Harness {
        orchestrator: DownloadOrchestrator,
        facility: Arc<RecordingFacility>,
        registry: HandleRegistry,
    }

    fn harness(backend_url: &str, accept: bool) -> Harness {
        let api_client = ApiClient::new(&ApiConfig {
            backend_url: backend_url.to_string(),
            connect_timeout: Duration::from_secs(2),
        })
        .unwrap();

        let registry = HandleRegistry::new();
        let facility = Arc::new(RecordingFacility::new(registry.clone(), accept));
        let sink = DownloadSink::new(
            registry.clone(),
            facility.clone(),
            &SinkConfig {
                download_dir: PathBuf::from("."),
                release_delay: Duration::from_millis(20),
                prompt_for_location: false,
            },
        );

        Harness {
            orchestrator: DownloadOrchestrator::new(api_client, sink),
            facility,
            registry,
        }
    }

    fn form_with(url: &str, format: MediaFormat) -> FormState {
        FormState {
            url_input: url.to_string(),
            ..FormState::with_format(format)
        }
    }

    /// Same sequence as the app's update loop: submit, run the task, finish.
    async fn press_download(orchestrator: &DownloadOrchestrator, form: &mut FormState) {
        let Some(pending) = orchestrator.submit(form) else {
            return;
        };
        let token = pending.token;
        let task = orchestrator.clone();
        let outcome = tokio::spawn(async move { task.execute(pending.request).await })
            .await
            .unwrap();
        DownloadOrchestrator::finish(form, token, &outcome);
    }

    struct ExplodingFacility;

    #[async_trait]
    impl DownloadFacility for ExplodingFacility {
        async fn download(&self, _options: DownloadOptions) -> Option<DownloadId> {
            panic!("facility exploded");
        }
    }

    fn status_text(form: &FormState) -> &str {
        &form.reporter.status().unwrap().text
    }

    #[tokio::test]
    async fn test_empty_input_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/download")
            .expect(0)
            .create_async()
            .await;

        let h = harness(&server.url(), true);
        let mut form = form_with("   ", MediaFormat::Mp4);
        press_download(&h.orchestrator, &mut form).await;

        mock.assert_async().await;
        assert_eq!(status_text(&form), "Please enter a YouTube URL");
        assert!(form.reporter.trigger_enabled());
    }

    #[tokio::test]
    async fn test_success_saves_under_hinted_name() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/download")
            .with_status(200)
            .with_header("content-disposition", r#"attachment; filename="song.mp3""#)
            .with_body(b"media-bytes".as_slice())
            .create_async()
            .await;

        let h = harness(&server.url(), true);
        let mut form = form_with("https://x/y", MediaFormat::Mp3);
        press_download(&h.orchestrator, &mut form).await;

        assert_eq!(status_text(&form), "✓ Downloaded: song.mp3");
        assert_eq!(form.reporter.status().unwrap().kind, StatusKind::Success);
        assert_eq!(form.reporter.state(), UiState::Completed(Completion::Success));
        assert!(form.url_input.is_empty());
        assert!(form.reporter.trigger_enabled());

        let calls = h.facility.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.filename, "song.mp3");
        assert!(!calls[0].0.prompt_for_location);
        assert_eq!(calls[0].1.as_deref(), Some(&b"media-bytes"[..]));
    }

    #[tokio::test]
    async fn test_server_error_keeps_input() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/download")
            .with_status(500)
            .with_body(r#"{"error":"invalid url"}"#)
            .create_async()
            .await;

        let h = harness(&server.url(), true);
        let mut form = form_with("https://x/y", MediaFormat::Mp4);
        press_download(&h.orchestrator, &mut form).await;

        assert_eq!(status_text(&form), "✗ Error: invalid url");
        assert_eq!(form.url_input, "https://x/y");
        assert!(form.reporter.trigger_enabled());
        assert!(h.facility.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let h = harness("http://127.0.0.1:1", true);
        let mut form = form_with("https://x/y", MediaFormat::Mp4);
        press_download(&h.orchestrator, &mut form).await;

        assert_eq!(
            status_text(&form),
            "✗ Cannot connect to backend. Make sure the server is running!"
        );
        assert!(form.reporter.trigger_enabled());
    }

    #[tokio::test]
    async fn test_sink_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/download")
            .with_status(200)
            .with_body(b"media".as_slice())
            .create_async()
            .await;

        let h = harness(&server.url(), false);
        let mut form = form_with("https://x/y", MediaFormat::Mp4);
        press_download(&h.orchestrator, &mut form).await;

        assert_eq!(status_text(&form), "✗ Download failed");
        assert_eq!(form.url_input, "https://x/y");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(h.registry.released_count(), 1);
        assert_eq!(h.registry.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_fallback_name_for_audio() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/download")
            .with_status(200)
            .with_body(b"audio".as_slice())
            .create_async()
            .await;

        let h = harness(&server.url(), true);
        let mut form = form_with("https://x/y", MediaFormat::Mp3);
        press_download(&h.orchestrator, &mut form).await;

        assert_eq!(status_text(&form), "✓ Downloaded: video.m4a");
        assert_eq!(h.facility.calls.lock().unwrap()[0].0.filename, "video.m4a");
    }

    #[tokio::test]
    async fn test_malformed_error_body_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/download")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let h = harness(&server.url(), true);
        let mut form = form_with("https://x/y", MediaFormat::Mp4);
        press_download(&h.orchestrator, &mut form).await;

        assert_eq!(status_text(&form), "✗ Unexpected response from backend");
        assert_eq!(form.reporter.state(), UiState::Completed(Completion::Error));
    }

    #[tokio::test]
    async fn test_handle_released_once_per_request() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/download")
            .with_status(200)
            .with_body(b"media".as_slice())
            .expect(2)
            .create_async()
            .await;

        let h = harness(&server.url(), true);
        for _ in 0..2 {
            let mut form = form_with("https://x/y", MediaFormat::Mp4);
            press_download(&h.orchestrator, &mut form).await;
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(h.registry.released_count(), 2);
        assert_eq!(h.registry.live_handles(), 0);
    }

    #[tokio::test]
    async fn test_submit_refused_while_in_flight() {
        let h = harness("http://127.0.0.1:1", true);
        let mut form = form_with("https://x/y", MediaFormat::Mp4);

        let pending = h.orchestrator.submit(&mut form).unwrap();
        assert!(h.orchestrator.submit(&mut form).is_none());
        assert!(!form.reporter.trigger_enabled());

        let outcome = h.orchestrator.execute(pending.request).await;
        DownloadOrchestrator::finish(&mut form, pending.token, &outcome);
        assert!(form.reporter.trigger_enabled());
    }

    #[tokio::test]
    async fn test_panic_in_chain_resets_trigger() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/download")
            .with_status(200)
            .with_body(b"media".as_slice())
            .create_async()
            .await;

        let api_client = ApiClient::new(&ApiConfig {
            backend_url: server.url(),
            connect_timeout: Duration::from_secs(2),
        })
        .unwrap();
        let registry = HandleRegistry::new();
        let sink = DownloadSink::new(
            registry.clone(),
            Arc::new(ExplodingFacility),
            &SinkConfig {
                download_dir: PathBuf::from("."),
                release_delay: Duration::from_millis(20),
                prompt_for_location: false,
            },
        );
        let orchestrator = DownloadOrchestrator::new(api_client, sink);

        let mut form = form_with("https://x/y", MediaFormat::Mp4);
        press_download(&orchestrator, &mut form).await;

        assert_eq!(status_text(&form), "✗ Unexpected error: facility exploded");
        assert_eq!(form.reporter.state(), UiState::Completed(Completion::Error));
        assert!(form.reporter.trigger_enabled());
        assert_eq!(form.url_input, "https://x/y");
        assert_eq!(registry.released_count(), 1);
        assert_eq!(registry.live_handles(), 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new("bang".to_string())), "bang");
        assert_eq!(panic_message(Box::new(42u8)), "panic in download task");
    }
}
