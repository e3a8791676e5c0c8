//! Error taxonomy for the surveillance engine
//!
//! Only `UpstreamRejection` ever escapes a fetch. Transient and malformed
//! responses degrade to "no data this cycle" and surface through the log.

use thiserror::Error;

/// Failure of a single HTTP exchange, always retryable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("server disconnected: {0}")]
    Disconnected(String),

    #[error("request timed out")]
    Timeout,
}

/// Errors that escape `ExchangeClient::fetch`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The exchange answered with its own structured error payload
    #[error("upstream rejected {url}: code={code} msg={message}")]
    UpstreamRejection {
        url: String,
        code: i64,
        message: String,
    },
}

/// Errors raised by the surveillance engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("surveillance task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
