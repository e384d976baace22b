use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::api::ApiConfig;
use crate::application::SinkConfig;
use crate::domain::MediaFormat;

pub const BACKEND_URL_VAR: &str = "MEDIA_DL_BACKEND_URL";
pub const CONNECT_TIMEOUT_VAR: &str = "MEDIA_DL_CONNECT_TIMEOUT_SECS";
pub const DOWNLOAD_DIR_VAR: &str = "MEDIA_DL_DOWNLOAD_DIR";
pub const RELEASE_DELAY_VAR: &str = "MEDIA_DL_RELEASE_DELAY_MS";
pub const PROMPT_VAR: &str = "MEDIA_DL_PROMPT";
pub const DEFAULT_FORMAT_VAR: &str = "MEDIA_DL_DEFAULT_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be true/false/1/0, got {value:?}")]
    InvalidBool { var: &'static str, value: String },

    #[error("{var} must be MP3 or MP4, got {value:?}")]
    InvalidFormat { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub sink: SinkConfig,
    pub default_format: MediaFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(BACKEND_URL_VAR) {
            config.api.backend_url = url.trim().to_string();
        }
        if let Some(value) = get(CONNECT_TIMEOUT_VAR) {
            let secs = parse_number(CONNECT_TIMEOUT_VAR, &value)?;
            config.api.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = get(DOWNLOAD_DIR_VAR) {
            config.sink.download_dir = PathBuf::from(dir);
        }
        if let Some(value) = get(RELEASE_DELAY_VAR) {
            let millis = parse_number(RELEASE_DELAY_VAR, &value)?;
            config.sink.release_delay = Duration::from_millis(millis);
        }
        if let Some(value) = get(PROMPT_VAR) {
            config.sink.prompt_for_location = parse_bool(PROMPT_VAR, &value)?;
        }
        if let Some(value) = get(DEFAULT_FORMAT_VAR) {
            config.default_format =
                value
                    .parse::<MediaFormat>()
                    .map_err(|_| ConfigError::InvalidFormat {
                        var: DEFAULT_FORMAT_VAR,
                        value: value.clone(),
                    })?;
        }

        Ok(config)
    }
}

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}
