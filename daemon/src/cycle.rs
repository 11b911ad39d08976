//! The scheduling loop: wait for association, wait for a sane clock, then
//! repeat fetch -> render -> wait until shutdown.
//!
//! Everything here is one logical thread of control. A cycle's fetch blocks
//! until the transport's own timeout fires; there is no cancellation
//! primitive below the loop, so a hung transport stalls the board for that
//! long and no longer. The only state carried across cycles is the
//! full-refresh baseline.

use std::time::Duration;

use log::{info, warn};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use trackboard::clock;
use trackboard::error::FetchError;
use trackboard::util::poll_until;

use crate::config::Config;
use crate::display::Dispatcher;
use crate::fetch::FetchSource;
use crate::network::Network;

/// The clock must read later than this before the first render. An unsynced
/// RTC starts at the epoch and would otherwise put 1970 times on the panel.
const PLAUSIBLE_EPOCH: i64 = 8 * 3600 * 2;

/// How long each wait state polls before logging that it is still waiting.
const WAIT_LOG_INTERVAL: Duration = Duration::from_secs(30);
const POLL_STEP: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Delay between cycles.
    pub cycle_interval: Duration,
    /// Short delay after a transport-level connect failure.
    pub connect_retry: Duration,
    /// Delay while the network reports no association.
    pub reconnect_backoff: Duration,
    /// How often the full inversion refresh runs.
    pub full_refresh_interval: Duration,
}

impl CycleSettings {
    pub fn from_config(config: &Config) -> Self {
        CycleSettings {
            cycle_interval: Duration::from_secs(config.cycle_interval_secs),
            connect_retry: Duration::from_secs(config.connect_retry_secs),
            reconnect_backoff: Duration::from_secs(config.reconnect_backoff_secs),
            full_refresh_interval: Duration::from_secs(config.full_refresh_secs),
        }
    }
}

pub struct CycleController<F, N> {
    fetcher: F,
    network: N,
    dispatcher: Dispatcher,
    settings: CycleSettings,
    last_full_refresh: Instant,
}

impl<F: FetchSource, N: Network> CycleController<F, N> {
    pub fn new(fetcher: F, network: N, dispatcher: Dispatcher, settings: CycleSettings) -> Self {
        CycleController {
            fetcher,
            network,
            dispatcher,
            settings,
            last_full_refresh: Instant::now(),
        }
    }

    /// Drive the state machine until `shutdown` fires:
    /// Connecting -> TimeSyncing -> Running.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = self.wait_for_connection() => {}
        }
        info!("network associated");

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = wait_for_time_sync(clock::now_epoch) => {}
        }
        info!("clock synced, entering cycle loop");

        loop {
            let wait = self.run_cycle_once().await;
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("cycle loop stopping");
                    return;
                }
                _ = sleep(wait) => {}
            }
            // Ghosting control runs every cycle regardless of outcome, and
            // completes before the next render touches the panel.
            self.last_full_refresh = self.dispatcher.maybe_full_refresh(
                Instant::now(),
                self.last_full_refresh,
                self.settings.full_refresh_interval,
            );
        }
    }

    /// One pass of the Running state. Returns the wait before the next pass.
    async fn run_cycle_once(&mut self) -> Duration {
        if !self.network.is_connected().await {
            warn!("network not associated");
            self.dispatcher
                .render_outcome(&Err(FetchError::ConnectionLost));
            self.network.reconnect().await;
            return self.settings.reconnect_backoff;
        }

        let outcome = self.fetcher.fetch(clock::now_epoch()).await;
        let wait = match &outcome {
            Ok(view) => {
                info!(
                    "next departure {} from {}",
                    view.origin_time, view.origin_station
                );
                self.settings.cycle_interval
            }
            // A transport-level failure is usually transient; retry fast
            // instead of sitting out the whole cadence.
            Err(FetchError::ConnectionLost) => {
                warn!("fetch failed: connection lost");
                self.settings.connect_retry
            }
            Err(e) => {
                warn!("fetch failed: {e}");
                self.settings.cycle_interval
            }
        };
        self.dispatcher.render_outcome(&outcome);
        wait
    }

    /// Connecting state: block until the collaborator reports association.
    /// Retries indefinitely; the provisioning fallback on prolonged failure
    /// is the supervisor's call, not ours.
    async fn wait_for_connection(&self) {
        loop {
            if poll_until(WAIT_LOG_INTERVAL, POLL_STEP, || self.network.is_connected()).await {
                return;
            }
            warn!("still waiting for network association");
        }
    }
}

/// TimeSyncing state: block until the time-sync collaborator has set a
/// plausible clock. Deliberately unbounded; there is nothing useful to show
/// with a wrong clock, so the reference behavior of never giving up stands.
pub async fn wait_for_time_sync(now_epoch: impl Fn() -> i64) {
    loop {
        let synced = poll_until(WAIT_LOG_INTERVAL, POLL_STEP, || {
            let plausible = now_epoch() > PLAUSIBLE_EPOCH;
            async move { plausible }
        })
        .await;
        if synced {
            return;
        }
        warn!("waiting for time sync");
    }
}
