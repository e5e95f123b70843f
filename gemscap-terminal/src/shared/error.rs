use thiserror::Error;

/// Errors raised by the analytics REST client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{label} request failed: {source}")]
    Request {
        label: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{label} failed: {status} {body}")]
    Status {
        label: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{label} returned invalid JSON: {source}")]
    Decode {
        label: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Network-level failure (connection refused, reset, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Request { .. })
    }

    /// Request label the error belongs to, if any.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            ApiError::Request { label, .. }
            | ApiError::Status { label, .. }
            | ApiError::Decode { label, .. } => Some(label),
            ApiError::Url(_) => None,
        }
    }
}

/// Errors raised by the tick feed transport.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FeedError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("SocketError: {0}")]
    Socket(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(value.to_string())
    }
}
