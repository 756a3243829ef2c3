// Error types for backend and push-channel transports
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("push transport error: {0}")]
    Transport(String),
}
