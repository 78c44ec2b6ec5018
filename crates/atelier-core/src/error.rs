//! Error types for Atelier

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failure reported by an external generation service.
///
/// Decided once at the client boundary from the HTTP status and the
/// upstream's structured status field. Callers branch on this, never on
/// error message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// Throttled (HTTP 429 / `RESOURCE_EXHAUSTED`)
    RateLimited,
    /// Server-side 5xx or transport failure
    TransientUpstream,
    /// Credential rejected or missing (HTTP 401/403)
    AuthenticationInvalid,
    /// Requested entity does not exist (HTTP 404). Gemini reports an
    /// unusable key this way, so it is treated as a credential rejection
    NotFound,
    Unknown,
}

impl ServiceErrorKind {
    /// Classify an HTTP failure.
    ///
    /// `upstream_status` is the symbolic status carried in a Google-style
    /// error body (`{"error": {"status": "RESOURCE_EXHAUSTED"}}`), which takes
    /// precedence over the numeric code when present and recognized.
    pub fn from_http(code: u16, upstream_status: Option<&str>) -> Self {
        let by_status = upstream_status.and_then(|s| match s {
            "RESOURCE_EXHAUSTED" => Some(Self::RateLimited),
            "UNAVAILABLE" | "INTERNAL" | "DEADLINE_EXCEEDED" => Some(Self::TransientUpstream),
            "UNAUTHENTICATED" | "PERMISSION_DENIED" => Some(Self::AuthenticationInvalid),
            "NOT_FOUND" => Some(Self::NotFound),
            _ => None,
        });
        if let Some(kind) = by_status {
            return kind;
        }

        match code {
            429 => Self::RateLimited,
            401 | 403 => Self::AuthenticationInvalid,
            404 => Self::NotFound,
            500..=599 => Self::TransientUpstream,
            _ => Self::Unknown,
        }
    }

    /// Whether the backoff wrapper should retry this failure
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientUpstream)
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceErrorKind::RateLimited => write!(f, "rate limited"),
            ServiceErrorKind::TransientUpstream => write!(f, "transient upstream failure"),
            ServiceErrorKind::AuthenticationInvalid => write!(f, "authentication invalid"),
            ServiceErrorKind::NotFound => write!(f, "not found"),
            ServiceErrorKind::Unknown => write!(f, "unknown failure"),
        }
    }
}

/// The main error type for Atelier operations
#[derive(Debug, Error)]
pub enum AtelierError {
    #[error("Service error ({kind}): {message}")]
    Service {
        kind: ServiceErrorKind,
        message: String,
    },

    #[error("No output produced: {0}")]
    NoOutputProduced(String),

    #[error("Credential required: {0}")]
    CredentialRequired(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Quota error: {0}")]
    QuotaError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),
}

impl AtelierError {
    /// Build a classified service error
    pub fn service(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        AtelierError::Service {
            kind,
            message: message.into(),
        }
    }

    /// The upstream classification, if this error came from a service call
    pub fn service_kind(&self) -> Option<ServiceErrorKind> {
        match self {
            AtelierError::Service { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.service_kind().is_some_and(ServiceErrorKind::is_retryable)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.service_kind() == Some(ServiceErrorKind::RateLimited)
    }

    /// Rejected or missing credentials, whether reported upstream or locally.
    ///
    /// The upstream answers an unusable key with "entity not found", so
    /// `NotFound` counts as an authentication failure.
    pub fn is_authentication(&self) -> bool {
        matches!(self, AtelierError::CredentialRequired(_)) || self.rejects_credential()
    }

    /// The upstream refused the selected credential; a new one must be picked
    pub fn rejects_credential(&self) -> bool {
        matches!(
            self.service_kind(),
            Some(ServiceErrorKind::AuthenticationInvalid | ServiceErrorKind::NotFound)
        )
    }
}

/// Result type alias for Atelier operations
pub type Result<T> = std::result::Result<T, AtelierError>;

impl From<toml::de::Error> for AtelierError {
    fn from(err: toml::de::Error) -> Self {
        AtelierError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for AtelierError {
    fn from(err: toml::ser::Error) -> Self {
        AtelierError::TomlSerError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_status_code() {
        assert_eq!(ServiceErrorKind::from_http(429, None), ServiceErrorKind::RateLimited);
        assert_eq!(
            ServiceErrorKind::from_http(503, None),
            ServiceErrorKind::TransientUpstream
        );
        assert_eq!(
            ServiceErrorKind::from_http(401, None),
            ServiceErrorKind::AuthenticationInvalid
        );
        assert_eq!(ServiceErrorKind::from_http(404, None), ServiceErrorKind::NotFound);
        assert_eq!(ServiceErrorKind::from_http(400, None), ServiceErrorKind::Unknown);
    }

    #[test]
    fn test_upstream_status_wins_over_code() {
        assert_eq!(
            ServiceErrorKind::from_http(400, Some("RESOURCE_EXHAUSTED")),
            ServiceErrorKind::RateLimited
        );
        assert_eq!(
            ServiceErrorKind::from_http(400, Some("PERMISSION_DENIED")),
            ServiceErrorKind::AuthenticationInvalid
        );
        // Unrecognized symbolic status falls back to the numeric code
        assert_eq!(
            ServiceErrorKind::from_http(502, Some("SOMETHING_ELSE")),
            ServiceErrorKind::TransientUpstream
        );
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ServiceErrorKind::RateLimited.is_retryable());
        assert!(ServiceErrorKind::TransientUpstream.is_retryable());
        assert!(!ServiceErrorKind::AuthenticationInvalid.is_retryable());
        assert!(!ServiceErrorKind::NotFound.is_retryable());
        assert!(!ServiceErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn test_error_helpers() {
        let err = AtelierError::service(ServiceErrorKind::RateLimited, "slow down");
        assert!(err.is_rate_limited());
        assert!(err.is_retryable());
        assert!(!err.is_authentication());

        let err = AtelierError::CredentialRequired("no key".to_string());
        assert!(err.is_authentication());
        assert!(!err.is_retryable());
        assert_eq!(err.service_kind(), None);

        let err = AtelierError::NoOutputProduced("empty".to_string());
        assert!(!err.is_retryable());
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_not_found_is_authentication() {
        let err = AtelierError::service(
            ServiceErrorKind::NotFound,
            "HTTP 404: Requested entity was not found.",
        );
        assert!(err.is_authentication());
        assert!(err.rejects_credential());
        assert!(!err.is_retryable());

        let local = AtelierError::CredentialRequired("no key".to_string());
        assert!(local.is_authentication());
        assert!(!local.rejects_credential());

        let generic = AtelierError::service(ServiceErrorKind::Unknown, "boom");
        assert!(!generic.is_authentication());
    }
}
