use crate::domain::{AppError, Completion, DownloadOutcome, MediaFormat, RequestToken, UiState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

/// Lifecycle of the single request the form may have in flight.
#[derive(Debug)]
pub struct StatusReporter {
    state: UiState,
    status: Option<StatusLine>,
    next_token: u64,
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter {
    pub fn new() -> Self {
        Self {
            state: UiState::Idle,
            status: None,
            next_token: 0,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn trigger_enabled(&self) -> bool {
        !matches!(self.state, UiState::InFlight(_))
    }

    pub fn trigger_label(&self) -> &'static str {
        if self.trigger_enabled() {
            "Download"
        } else {
            "Downloading..."
        }
    }

    /// Claim the single request slot. `None` while another request is in flight.
    pub fn begin(&mut self) -> Option<RequestToken> {
        if !self.trigger_enabled() {
            return None;
        }

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        self.state = UiState::InFlight(token);
        self.status = None;
        Some(token)
    }

    /// Show an input problem without entering flight.
    pub fn reject(&mut self, error: &AppError) {
        if !self.trigger_enabled() {
            return;
        }
        self.state = UiState::Completed(Completion::Error);
        self.status = Some(StatusLine {
            kind: StatusKind::Error,
            text: error.to_string(),
        });
    }

    /// Leave flight. Stale tokens are ignored and return `false`.
    pub fn complete(&mut self, token: RequestToken, outcome: &DownloadOutcome) -> bool {
        if self.state != UiState::InFlight(token) {
            return false;
        }

        let (completion, line) = match outcome {
            Ok(saved) => (
                Completion::Success,
                StatusLine {
                    kind: StatusKind::Success,
                    text: format!("✓ Downloaded: {}", saved.filename),
                },
            ),
            Err(error) => (
                Completion::Error,
                StatusLine {
                    kind: StatusKind::Error,
                    text: format!("✗ {}", error),
                },
            ),
        };

        self.state = UiState::Completed(completion);
        self.status = Some(line);
        true
    }

    /// Back to Idle once the user starts editing again. The last status
    /// line stays visible until the next request begins.
    pub fn acknowledge(&mut self) {
        if let UiState::Completed(_) = self.state {
            self.state = UiState::Idle;
        }
    }
}

/// Everything the form shows, passed explicitly through the orchestrator.
#[derive(Debug, Default)]
pub struct FormState {
    pub url_input: String,
    pub format: MediaFormat,
    pub reporter: StatusReporter,
}

impl FormState {
    pub fn with_format(format: MediaFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}
