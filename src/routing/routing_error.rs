use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing request failed: {0}")]
    Network(String),

    #[error("routing request timed out")]
    Timeout,

    #[error("no walking route found")]
    NoRoute,

    #[error("unexpected routing response: {0}")]
    InvalidResponse(String),
}

impl RoutingError {
    /// Worth trying again on a later cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RoutingError::Network(_) | RoutingError::Timeout)
    }
}

impl From<reqwest::Error> for RoutingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RoutingError::Timeout
        } else if e.is_decode() {
            RoutingError::InvalidResponse(e.to_string())
        } else {
            RoutingError::Network(e.to_string())
        }
    }
}
