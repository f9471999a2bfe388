use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTML parse error: {0}")]
    HtmlParse(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Could not interpret {field}: {value:?}")]
    Deserialize { field: &'static str, value: String },
}

impl ScraperError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScraperError::Network(_) | ScraperError::Timeout(_))
    }
}

impl From<reqwest::Error> for ScraperError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScraperError::Timeout(e.to_string())
        } else {
            ScraperError::Network(e.to_string())
        }
    }
}
