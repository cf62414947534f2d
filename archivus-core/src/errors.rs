//! Structured errors for Archivus.
//!
//! A single [`ArchivusError`] carries an [`ErrorKind`] mapped to an HTTP
//! status code and a stable kebab-case client code, a human message, optional
//! JSON `details`, and an optional wrapped `source`. The Worker Pool uses
//! `ErrorKind::retryable()` to decide fail-with-retry vs. terminal-fail
//! without inspecting the message text.

use thiserror::Error;

pub type ArchivusResult<T> = std::result::Result<T, ArchivusError>;

/// Error kinds named in the error-handling design. Not exhaustive of every
/// Rust error type in the crate — this is the client/worker-facing
/// classification, not an internal implementation detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    QuotaExceeded,
    TooLarge,
    UnsupportedFormat,
    DuplicateExists,
    NotFound,
    Unauthorized,
    InvalidInput,
    StorageFailure,
    PersistenceFailure,
    TransientUpstream,
    CapabilityUnavailable,
    LeaseExpired,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::QuotaExceeded => 402,
            ErrorKind::TooLarge => 413,
            ErrorKind::UnsupportedFormat => 415,
            ErrorKind::DuplicateExists => 409,
            ErrorKind::NotFound => 404,
            ErrorKind::Unauthorized => 401,
            ErrorKind::InvalidInput => 400,
            ErrorKind::StorageFailure => 502,
            ErrorKind::PersistenceFailure => 500,
            ErrorKind::TransientUpstream => 503,
            ErrorKind::CapabilityUnavailable => 501,
            ErrorKind::LeaseExpired => 409,
            ErrorKind::Cancelled => 499,
            ErrorKind::Internal => 500,
        }
    }

    /// Stable kebab-case client code, used as the `error` field in the HTTP
    /// JSON body and usable for localization on the client.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::QuotaExceeded => "quota-exceeded",
            ErrorKind::TooLarge => "too-large",
            ErrorKind::UnsupportedFormat => "unsupported-format",
            ErrorKind::DuplicateExists => "duplicate-exists",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidInput => "invalid-input",
            ErrorKind::StorageFailure => "storage-failure",
            ErrorKind::PersistenceFailure => "persistence-failure",
            ErrorKind::TransientUpstream => "transient-upstream",
            ErrorKind::CapabilityUnavailable => "capability-unavailable",
            ErrorKind::LeaseExpired => "lease-expired",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }

    /// Whether a Worker Pool stage handler that fails with this kind should
    /// be returned to `queued` with backoff (`true`) or terminally failed
    /// (`false`). Only the kinds the error-handling design names as
    /// retryable return true; every other kind is a deliberate, permanent
    /// failure.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::TransientUpstream | ErrorKind::LeaseExpired | ErrorKind::PersistenceFailure
        )
    }
}

/// The crate-wide error type. Implements `std::error::Error`, `Display`,
/// and serializes to the HTTP JSON shape directly.
#[derive(Debug, Error)]
#[error("{} ({}): {}", kind.code(), kind.status_code(), message)]
pub struct ArchivusError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<serde_json::Value>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ArchivusError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn retryable(&self) -> bool {
        self.kind.retryable()
    }

    /// Drop the wrapped `source` before handing this error to a transport
    /// layer. Backend internals and stack traces never reach the wire.
    pub fn sanitize_for_client(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            details: self.details.clone(),
            source: None,
        }
    }

    /// The HTTP JSON body shape: `{ "error", "message", "details"?, "code"? }`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "error": self.kind.code(),
            "message": self.message,
            "code": self.status_code(),
        });
        if let Some(details) = &self.details {
            body["details"] = details.clone();
        }
        body
    }

    // ---- Constructors ----

    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::QuotaExceeded, msg)
    }
    pub fn too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TooLarge, msg)
    }
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedFormat, msg)
    }
    pub fn duplicate_exists(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateExists, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, msg)
    }
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, msg)
    }
    pub fn storage_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageFailure, msg)
    }
    pub fn persistence_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PersistenceFailure, msg)
    }
    pub fn transient_upstream(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientUpstream, msg)
    }
    pub fn capability_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapabilityUnavailable, msg)
    }
    pub fn lease_expired(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::LeaseExpired, msg)
    }
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, msg)
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }
}

impl Clone for ArchivusError {
    /// Clones lose the wrapped `source` (errors aren't generally `Clone`);
    /// everything client-visible survives.
    fn clone(&self) -> Self {
        self.sanitize_for_client()
    }
}

/// Convenience macro for "bail with ArchivusError".
#[macro_export]
macro_rules! bail_archivus {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::ArchivusError::$ctor($msg));
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::ArchivusError::$ctor(format!($fmt, $($arg)*)));
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_design() {
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::QuotaExceeded.status_code(), 402);
        assert_eq!(ErrorKind::CapabilityUnavailable.status_code(), 501);
    }

    #[test]
    fn only_named_kinds_are_retryable() {
        assert!(ErrorKind::TransientUpstream.retryable());
        assert!(ErrorKind::LeaseExpired.retryable());
        assert!(ErrorKind::PersistenceFailure.retryable());
        assert!(!ErrorKind::CapabilityUnavailable.retryable());
        assert!(!ErrorKind::InvalidInput.retryable());
        assert!(!ErrorKind::Cancelled.retryable());
        assert!(!ErrorKind::NotFound.retryable());
    }

    #[test]
    fn to_json_matches_http_shape() {
        let err = ArchivusError::not_found("document missing").with_details(serde_json::json!({"id": "abc"}));
        let json = err.to_json();
        assert_eq!(json["error"], "not-found");
        assert_eq!(json["message"], "document missing");
        assert_eq!(json["code"], 404);
        assert_eq!(json["details"]["id"], "abc");
    }

    #[test]
    fn sanitize_drops_source() {
        let io_err = std::io::Error::other("disk full");
        let err = ArchivusError::storage_failure("write failed").with_source(io_err);
        let sanitized = err.sanitize_for_client();
        assert!(sanitized.source.is_none());
        assert_eq!(sanitized.message, "write failed");
    }
}
