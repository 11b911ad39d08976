use std::path::PathBuf;

use anyhow::Result;
use log::{info, warn};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use trackboard_daemon::config::{self, PanelKind};
use trackboard_daemon::cycle::{CycleController, CycleSettings};
use trackboard_daemon::display::framebuffer::FramebufferPanel;
use trackboard_daemon::display::headless::HeadlessPanel;
use trackboard_daemon::display::{Dispatcher, Panel};
use trackboard_daemon::fetch::Fetcher;
use trackboard_daemon::network::WlanNetwork;
use trackboard_daemon::reset;

const DEFAULT_CONFIG_PATH: &str = "/data/trackboard/config.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    trackboard::init_logging(log::LevelFilter::Info);

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = config::load_config(&config_path).await?;
    info!("trackboard-daemon {} starting", env!("CARGO_PKG_VERSION"));

    let data_dir = PathBuf::from(&config.data_dir);
    if reset::version_changed(&data_dir).await? {
        reset::wipe_credentials(&data_dir).await;
        info!("new build detected, credentials wiped; exiting for reprovisioning");
        return Ok(());
    }

    if config.api_base_url.is_empty() {
        warn!("api_base_url is not configured; every fetch will fail until it is set");
    }

    let panel: Box<dyn Panel> = match config.panel {
        PanelKind::Framebuffer => Box::new(FramebufferPanel::new(&config)),
        PanelKind::Headless => Box::new(HeadlessPanel::new()),
    };
    let controller = CycleController::new(
        Fetcher::new(&config)?,
        WlanNetwork::new(&config.wifi_interface),
        Dispatcher::new(panel),
        CycleSettings::from_config(&config),
    );

    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();
    {
        let shutdown = shutdown.clone();
        tracker.spawn(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received");
            shutdown.cancel();
        });
    }

    controller.run(shutdown.clone()).await;
    shutdown.cancel();
    tracker.close();
    tracker.wait().await;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!("couldn't install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
