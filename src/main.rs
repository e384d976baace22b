mod api;
mod app;
mod application;
mod config;
mod domain;
mod logging;
mod ui;
mod utils;

use iced::window;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::config::AppConfig;

fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        warn!("ignoring invalid configuration: {}", e);
        AppConfig::default()
    });
    info!(
        backend = %config.api.backend_url,
        download_dir = %config.sink.download_dir.display(),
        "starting media downloader"
    );

    // Fail before opening a window if the backend URL is unusable.
    let api_client = ApiClient::new(&config.api)?;
    info!(endpoint = %api_client.download_url(), "backend endpoint resolved");

    iced::application(
        move || app::DownloadApp::new(api_client.clone(), &config).boot(),
        app::update,
        app::view,
    )
    .title("Media Downloader")
    .window(window::Settings {
        size: iced::Size::new(480.0, 420.0),
        ..Default::default()
    })
    .run()?;

    Ok(())
}
