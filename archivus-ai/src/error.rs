use thiserror::Error;

pub type AiResult<T> = std::result::Result<T, AiError>;

/// Errors a provider call can fail with. The adapter uses the retryable
/// split to decide whether to retry with backoff or fail the call outright.
#[derive(Debug, Error, Clone)]
pub enum AiError {
    /// HTTP 401 equivalent. Never retried.
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// HTTP 400 equivalent. Never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// HTTP 429 equivalent. Retried with backoff up to `retry_attempts`.
    #[error("rate limited by upstream provider: {0}")]
    RateLimited(String),

    /// HTTP 5xx equivalent. Retried with backoff up to `retry_attempts`.
    #[error("transient upstream failure: {0}")]
    Upstream(String),

    /// The provider does not implement the requested capability. Callers
    /// treat this as a non-retryable, stage-skipping failure.
    #[error("capability not supported by this provider: {0}")]
    CapabilityUnavailable(String),

    /// The caller's cancellation token fired, e.g. while waiting on the
    /// rate limiter.
    #[error("request cancelled")]
    Cancelled,

    /// Provider returned output that could not be parsed into the expected
    /// structured shape.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl AiError {
    /// §4.6: retry transient failures (429, 5xx) with backoff; 401/400 are
    /// non-retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AiError::RateLimited(_) | AiError::Upstream(_))
    }
}

impl From<AiError> for archivus_core::ArchivusError {
    fn from(err: AiError) -> Self {
        use archivus_core::ArchivusError;
        match err {
            AiError::Unauthorized(msg) => ArchivusError::unauthorized(msg),
            AiError::InvalidRequest(msg) => ArchivusError::invalid_input(msg),
            AiError::RateLimited(msg) | AiError::Upstream(msg) => ArchivusError::transient_upstream(msg),
            AiError::CapabilityUnavailable(msg) => ArchivusError::capability_unavailable(msg),
            AiError::Cancelled => ArchivusError::cancelled("ai adapter call cancelled"),
            AiError::MalformedResponse(msg) => ArchivusError::transient_upstream(msg),
        }
    }
}
