//! Upstream schedule queries.
//!
//! One GET per cycle, no internal retries: the cycle controller owns the
//! retry cadence. Certificate validation is disabled because the upstream's
//! certificate is not pinned and the board ships no managed CA bundle; this
//! is an accepted trust gap, not an oversight.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::LOCATION;

use trackboard::clock::{AEST, TzRule};
use trackboard::error::FetchError;
use trackboard::schedule::{self, ApiErrorBody, DepartureView, FetchOutcome};

use crate::config::Config;

/// Truncation limit for raw error bodies shown on the panel.
const DETAIL_LIMIT: usize = 120;

/// The seam between the cycle controller and the upstream query, so tests
/// can drive the loop without a network.
#[async_trait]
pub trait FetchSource: Send {
    async fn fetch(&self, now_epoch: i64) -> FetchOutcome;
}

pub struct Fetcher {
    client: reqwest::Client,
    url: String,
    tz: TzRule,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Fetcher {
            client,
            url: compose_url(
                &config.api_base_url,
                &config.origin_code,
                &config.destination_code,
            ),
            tz: AEST,
        })
    }

    /// Issue the GET, following at most one redirect. A second redirect is
    /// handed back as-is and surfaces as an HTTP status failure.
    async fn get_once_redirected(&self) -> Result<reqwest::Response, FetchError> {
        debug!("GET {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_redirection()
            && let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            && let Some(next) = resolve_location(&self.url, location)
        {
            info!("following redirect to {next}");
            return self.client.get(next).send().await.map_err(transport_error);
        }
        Ok(response)
    }
}

#[async_trait]
impl FetchSource for Fetcher {
    async fn fetch(&self, now_epoch: i64) -> FetchOutcome {
        let response = self.get_once_redirected().await?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                detail: summarize_error_body(status.as_u16(), &body),
            });
        }

        let journeys = schedule::parse_body(&body)?;
        let leg = schedule::select_next(&journeys, now_epoch)?;
        DepartureView::from_leg(&leg, &self.tz)
    }
}

fn transport_error(e: reqwest::Error) -> FetchError {
    warn!("transport error: {e}");
    FetchError::ConnectionLost
}

/// Request URL per the upstream's query format: the origin code lands
/// directly after the base, the destination as a second query parameter.
pub fn compose_url(base: &str, origin: &str, destination: &str) -> String {
    format!("{base}{origin}&name_destination={destination}")
}

/// Resolve a `Location` header value against the URL that produced it, so
/// relative redirects work too.
fn resolve_location(current: &str, location: &str) -> Option<String> {
    url::Url::parse(current)
        .ok()?
        .join(location)
        .ok()
        .map(|u| u.to_string())
}

/// Condense a non-2xx body for the panel: prefer the upstream's structured
/// `{error, details}` text, fall back to a clipped raw body or the bare
/// status.
pub fn summarize_error_body(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return match parsed.details {
            Some(details) => format!("{}: {details}", parsed.error),
            None => parsed.error,
        };
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("status {status}");
    }
    trimmed.chars().take(DETAIL_LIMIT).collect()
}
