use thiserror::Error;

/// Error types that can occur while running a sweep.
#[derive(Debug, Error)]
pub enum SweepError {
    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),
    /// Authentication and authorization errors
    #[error("Auth error: {0}")]
    Auth(String),
    /// The service rejected the request for rate-limiting reasons
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// The request did not complete within the configured timeout
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Invalid request parameters or format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Errors returned by the completion service
    #[error("Provider error: {0}")]
    Provider(String),
    /// API response parsing or format error
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormat {
        message: String,
        raw_response: String,
    },
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    Json(String),
    /// Invalid or incomplete configuration, fatal before the sweep starts
    #[error("Config error: {0}")]
    Config(String),
    /// Failure writing the result table
    #[error("Persist error: {0}")]
    Persist(String),
    /// Retry attempts exceeded
    #[error("Retry attempts exceeded after {attempts} tries: {last_error}")]
    RetryExceeded { attempts: usize, last_error: String },
}

impl SweepError {
    /// Whether the error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SweepError::Http(_)
                | SweepError::RateLimited(_)
                | SweepError::Timeout(_)
                | SweepError::Provider(_)
        )
    }
}

impl From<reqwest::Error> for SweepError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SweepError::Timeout(err.to_string())
        } else {
            SweepError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(err: serde_json::Error) -> Self {
        SweepError::Json(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}

impl From<std::io::Error> for SweepError {
    fn from(err: std::io::Error) -> Self {
        SweepError::Persist(err.to_string())
    }
}
