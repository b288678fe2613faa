use reqwest::StatusCode;
use thiserror::Error;

/// Why a single availability request produced no data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, timeout or an unreadable response body.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The booking system refused the request, usually anti-automation
    /// filtering of cloud/data center IPs.
    #[error("access denied (403)")]
    Blocked,

    /// Any other non-success status, with the start of the body.
    #[error("upstream returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The body was not the expected availability JSON.
    #[error("could not decode availability response: {0}")]
    Decode(#[from] serde_json::Error),
}
