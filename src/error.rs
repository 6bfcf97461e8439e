/// Failures raised by the retriever or the generation backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Missing or rejected credentials. Never retried.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by backend")]
    RateLimited,

    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("malformed backend response: {0}")]
    Malformed(String),

    #[error("passage store failure: {0}")]
    Storage(String),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BackendError::Config(_))
    }
}

/// Rejected caller input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query must be a non-empty string")]
    EmptyQuery,

    #[error("top_k must be a positive integer")]
    InvalidTopK,

    #[error("mode must be one of [\"default\", \"extractive\"], got '{0}'")]
    UnknownMode(String),
}
