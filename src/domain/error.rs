//! Library-wide error type for sync operations.

/// Error kinds surfaced by the pipeline.
///
/// Retry handling lives in the HTTP layer; by the time a `SyncError` reaches
/// a reconciler it is definitive.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Configuration or environment issue. Fatal at start-up.
    #[error("{0}")]
    Config(String),

    /// Connectivity or timeout failure after retries were exhausted.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 429 after all scheduled retries.
    #[error("rate limited on {endpoint} after {attempts} attempts")]
    RateLimited { endpoint: String, attempts: u32 },

    /// 401 the caller is expected to surface.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success API response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not decode into the expected shape.
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Blob store failure (local or object storage).
    #[error("storage error: {0}")]
    Storage(String),

    /// Domain-level mismatch the run can usually proceed past.
    #[error("{0}")]
    BusinessRule(String),
}

impl SyncError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        SyncError::Config(message.into())
    }

    pub fn storage<S: Into<String>>(message: S) -> Self {
        SyncError::Storage(message.into())
    }
}
