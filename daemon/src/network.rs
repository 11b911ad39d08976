//! Observation of the WiFi collaborator.
//!
//! Association and credentials are wpa_supplicant's job (provisioned
//! externally); the daemon only needs to know whether the interface is up,
//! and to nudge it when it isn't.

use std::path::PathBuf;

use async_trait::async_trait;
use log::warn;
use tokio::process::Command;

#[async_trait]
pub trait Network: Send {
    async fn is_connected(&self) -> bool;
    /// Best-effort reconnection kick; association itself happens out of
    /// process.
    async fn reconnect(&self);
}

pub struct WlanNetwork {
    iface: String,
    operstate_path: PathBuf,
}

impl WlanNetwork {
    pub fn new(iface: &str) -> Self {
        WlanNetwork {
            iface: iface.to_string(),
            operstate_path: PathBuf::from(format!("/sys/class/net/{iface}/operstate")),
        }
    }

    #[cfg(test)]
    fn with_operstate_path(iface: &str, path: PathBuf) -> Self {
        WlanNetwork {
            iface: iface.to_string(),
            operstate_path: path,
        }
    }
}

#[async_trait]
impl Network for WlanNetwork {
    async fn is_connected(&self) -> bool {
        match tokio::fs::read_to_string(&self.operstate_path).await {
            Ok(state) => state.trim() == "up",
            Err(_) => false,
        }
    }

    async fn reconnect(&self) {
        // The interface sometimes ends up administratively down after a
        // power-save glitch; bringing it back up lets wpa_supplicant retry.
        let result = Command::new("ip")
            .args(["link", "set", &self.iface, "up"])
            .output()
            .await;
        match result {
            Ok(out) if !out.status.success() => {
                warn!(
                    "ip link set {} up failed: {}",
                    self.iface,
                    String::from_utf8_lossy(&out.stderr)
                );
            }
            Ok(_) => {}
            Err(e) => warn!("couldn't run ip link for {}: {e}", self.iface),
        }
    }
}
