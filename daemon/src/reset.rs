//! Build-tag bookkeeping and credential reset.
//!
//! When a new build boots for the first time, the stored WiFi credentials
//! are wiped so the external provisioning step runs again with a clean
//! slate; the supervisor then restarts the process. This is the only
//! process-terminating path besides an explicit signal.

use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

const BUILD_TAG_FILE: &str = "build-tag";
const WIFI_CREDS_FILE: &str = "wifi-creds.conf";

/// Compare the stored build tag against this binary's version, updating the
/// marker on disk. Returns whether a previously recorded, different build
/// was found. The very first boot records the tag and reports no change.
pub async fn version_changed(data_dir: &Path) -> Result<bool> {
    let marker = data_dir.join(BUILD_TAG_FILE);
    let current = env!("CARGO_PKG_VERSION");

    let stored = tokio::fs::read_to_string(&marker).await.ok();
    let changed = match stored.as_deref().map(str::trim) {
        Some(tag) if tag != current => {
            info!("build tag changed: {tag} -> {current}");
            true
        }
        Some(_) => false,
        None => false,
    };

    tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    tokio::fs::write(&marker, current)
        .await
        .with_context(|| format!("failed to write {}", marker.display()))?;
    Ok(changed)
}

/// Remove the stored WiFi credentials so provisioning reruns on next boot.
pub async fn wipe_credentials(data_dir: &Path) {
    let path = data_dir.join(WIFI_CREDS_FILE);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => info!("wiped stored credentials at {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to wipe credentials at {}: {e}", path.display()),
    }
}
