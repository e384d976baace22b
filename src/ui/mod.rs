use iced::{
    widget::{button, column, pick_list, row, text, text_input, Space},
    Element, Length,
};

use crate::application::{FormState, StatusKind};
use crate::domain::MediaFormat;

/// Main view state
#[derive(Debug, Default)]
pub struct DownloadView {
    pub form: FormState,
    /// Result of the startup health check; `None` until it answers.
    pub backend_online: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    FormatSelected(MediaFormat),
    DownloadPressed,
}

impl DownloadView {
    pub fn new(format: MediaFormat) -> Self {
        Self {
            form: FormState::with_format(format),
            backend_online: None,
        }
    }

    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.form.url_input = url;
                self.form.reporter.acknowledge();
            }
            DownloadMessage::FormatSelected(format) => {
                self.form.format = format;
            }
            DownloadMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let backend_hint = match self.backend_online {
            Some(true) => "Backend ready",
            Some(false) => "Backend not reachable",
            None => "Checking backend...",
        };

        let reporter = &self.form.reporter;
        let trigger = button(reporter.trigger_label())
            .on_press_maybe(
                reporter
                    .trigger_enabled()
                    .then_some(DownloadMessage::DownloadPressed),
            )
            .padding([10, 20]);

        let status: Element<'_, DownloadMessage> = match reporter.status() {
            Some(line) => {
                let label = text(&line.text).size(14);
                match line.kind {
                    StatusKind::Success => label.style(text::success).into(),
                    StatusKind::Error => label.style(text::danger).into(),
                }
            }
            None => Space::new().height(Length::Fixed(14.0)).into(),
        };

        column![
            text("Media Downloader").size(32),
            text(backend_hint).size(12),
            Space::new().height(Length::Fixed(20.0)),
            text("Video URL:").size(16),
            text_input("https://www.youtube.com/watch?v=...", &self.form.url_input)
                .on_input(DownloadMessage::UrlChanged)
                .on_submit(DownloadMessage::DownloadPressed)
                .padding(10),
            row![
                text("Format:").size(16),
                pick_list(
                    MediaFormat::ALL,
                    Some(self.form.format),
                    DownloadMessage::FormatSelected
                ),
            ]
            .spacing(10),
            Space::new().height(Length::Fixed(10.0)),
            status,
            Space::new().height(Length::Fixed(20.0)),
            trigger,
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}
