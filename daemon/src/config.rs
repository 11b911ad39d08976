use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Which panel backend to drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    /// The real e-paper panel behind a framebuffer device.
    Framebuffer,
    /// Log-only backend for bench runs without hardware.
    Headless,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base query URL; the origin stop code is appended directly, so the
    /// value ends mid-query-string (e.g. `...?name_origin=`).
    pub api_base_url: String,
    pub origin_code: String,
    pub destination_code: String,

    pub panel: PanelKind,
    pub fb_path: String,
    /// Sysfs attribute that switches the panel controller to the full
    /// (ghost-clearing) waveform for the next update.
    pub refresh_ctl_path: String,

    pub wifi_interface: String,
    pub data_dir: String,

    /// Delay between successful cycles, seconds.
    pub cycle_interval_secs: u64,
    /// Short retry delay after a transport-level connect failure, seconds.
    pub connect_retry_secs: u64,
    /// Backoff while the network reports no association, seconds.
    pub reconnect_backoff_secs: u64,
    /// How often to run the full inversion refresh, seconds.
    pub full_refresh_secs: u64,
    /// Collaborator-level timeout on the upstream request, seconds.
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: String::new(),
            origin_code: String::new(),
            destination_code: String::new(),
            panel: PanelKind::Framebuffer,
            fb_path: "/dev/fb0".to_string(),
            refresh_ctl_path: "/sys/class/graphics/fb0/epd_full_refresh".to_string(),
            wifi_interface: "wlan0".to_string(),
            data_dir: "/data/trackboard".to_string(),
            cycle_interval_secs: 30,
            connect_retry_secs: 1,
            reconnect_backoff_secs: 30,
            full_refresh_secs: 600,
            http_timeout_secs: 30,
        }
    }
}

/// Load the daemon config from a TOML file. A missing file is not fatal:
/// the defaults are returned and a warning logged, so a freshly provisioned
/// board still boots far enough to show its error view.
pub async fn load_config(path: &str) -> Result<Config> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            toml::from_str(&contents).with_context(|| format!("failed to parse config {path}"))
        }
        Err(e) => {
            warn!("couldn't read config {path} ({e}), using defaults");
            Ok(Config::default())
        }
    }
}
