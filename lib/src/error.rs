use thiserror::Error;

/// Failure kinds produced by a single fetch cycle.
///
/// Every variant is recoverable: the daemon renders the message text on the
/// panel and continues with the next cycle. The `Display` impls double as the
/// user-visible message view content, so they are phrased for a 2.13" screen
/// rather than for a log file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// A timestamp in the feed did not match `YYYY-MM-DDThh:mm:ss`.
    #[error("Bad timestamp: {0}")]
    MalformedTimestamp(String),

    /// The upstream answered with a non-2xx status. `detail` carries the
    /// server's `{error, details}` body text when present, else a summary.
    #[error("HTTP Error {status}: {detail}")]
    HttpStatus { status: u16, detail: String },

    /// The response body was not a valid journey array.
    #[error("JSON Error: {0}")]
    MalformedResponse(String),

    /// The feed returned an empty journey array.
    #[error("No train data found")]
    NoData,

    /// The request never reached the upstream (no association, connect
    /// refused, transport timeout).
    #[error("WiFi Lost!")]
    ConnectionLost,
}
