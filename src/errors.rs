use thiserror::Error;

/// Failures talking to the Squadcast API.
///
/// None of these escape the poll loop: each one is logged where it happens and
/// turned into an unhealthy cycle. Only the startup token exchange is fatal.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("token exchange failed: {0}")]
    Auth(String),

    #[error("{path} responded {status}")]
    Transport {
        path: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request to {path} failed: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Short label used in logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Auth(_) => "auth",
            ApiError::Transport { .. } => "transport",
            ApiError::Decode { .. } => "decode",
            ApiError::Network { .. } => "network",
            ApiError::InvalidRequest(_) => "invalid_request",
        }
    }
}
