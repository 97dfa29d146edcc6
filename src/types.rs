use thiserror::Error;

/// Errors produced by the daemon monitor.
///
/// Only supervisor and key commands surface these to callers; the poller
/// and the settings store absorb them and degrade to "offline" or to a
/// default value.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to spawn IPFS daemon: {0}")]
    ProcessSpawn(#[source] std::io::Error),

    #[error("IPFS API request `{path}` timed out")]
    QueryTimeout { path: String },

    #[error("IPFS API unreachable while requesting `{path}`: {source}")]
    QueryUnreachable {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("IPFS API error: {0}")]
    Ipfs(String),

    #[error("failed to decode setting `{key}`: {reason}")]
    PersistenceDecode { key: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IPFS daemon not ready: {0}")]
    NotReady(String),

    #[error("command failed: {0}")]
    Command(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl MonitorError {
    /// Classify a transport error for an API path into timeout, unreachable
    /// or a generic HTTP failure.
    pub fn from_request(path: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MonitorError::QueryTimeout {
                path: path.to_string(),
            }
        } else if err.is_connect() {
            MonitorError::QueryUnreachable {
                path: path.to_string(),
                source: err,
            }
        } else {
            MonitorError::Http(err)
        }
    }

    /// Whether the error means the node could not be reached at all.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MonitorError::QueryTimeout { .. } | MonitorError::QueryUnreachable { .. }
        )
    }
}
