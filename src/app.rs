use iced::Task;
use tracing::warn;

use crate::api::ApiClient;
use crate::application::{DownloadOrchestrator, DownloadSink};
use crate::config::AppConfig;
use crate::domain::{AppError, DownloadOutcome, RequestToken};
use crate::ui::{DownloadMessage, DownloadView};

pub struct DownloadApp {
    view: DownloadView,
    api_client: ApiClient,
    orchestrator: DownloadOrchestrator,
}

impl DownloadApp {
    pub fn new(api_client: ApiClient, config: &AppConfig) -> Self {
        let sink = DownloadSink::to_filesystem(&config.sink);
        let orchestrator = DownloadOrchestrator::new(api_client.clone(), sink);

        Self {
            view: DownloadView::new(config.default_format),
            api_client,
            orchestrator,
        }
    }

    /// Initial state plus the backend health check.
    pub fn boot(self) -> (Self, Task<Message>) {
        let api_client = self.api_client.clone();
        let health_check = Task::perform(
            async move {
                match api_client.health().await {
                    Ok(online) => online,
                    Err(e) => {
                        warn!("backend health check failed: {}", e);
                        false
                    }
                }
            },
            Message::BackendChecked,
        );
        (self, health_check)
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    BackendChecked(bool),
    DownloadFinished(RequestToken, DownloadOutcome),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            let pressed = matches!(ui_msg, DownloadMessage::DownloadPressed);
            app.view.update(ui_msg);

            if pressed {
                if let Some(pending) = app.orchestrator.submit(&mut app.view.form) {
                    let orchestrator = app.orchestrator.clone();
                    let token = pending.token;

                    // iced Task::perform runs in the background tokio executor
                    return Task::perform(
                        async move { orchestrator.execute(pending.request).await },
                        move |outcome| Message::DownloadFinished(token, outcome),
                    );
                }
            }
        }
        Message::BackendChecked(online) => {
            app.view.backend_online = Some(online);
        }
        Message::DownloadFinished(token, outcome) => {
            if let Some(online) = backend_reachability(&outcome) {
                app.view.backend_online = Some(online);
            }
            DownloadOrchestrator::finish(&mut app.view.form, token, &outcome);
        }
    }
    Task::none()
}

/// What a finished request says about the backend, if anything.
fn backend_reachability(outcome: &DownloadOutcome) -> Option<bool> {
    match outcome {
        Ok(_) | Err(AppError::Server(_)) | Err(AppError::Protocol { .. }) => Some(true),
        Err(AppError::Network { .. }) => Some(false),
        Err(_) => None,
    }
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}
