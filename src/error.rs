//! Failure types understood by the classifier, plus policy validation errors.
//!
//! API clients built on top of this crate usually surface a [`ServiceError`]; the
//! HTTP stack underneath reports a [`TransportError`]. Both implement
//! [`Classify`](crate::Classify), so they can be handed to
//! [`RetryExecutor::execute`](crate::RetryExecutor::execute) directly.

use std::time::Duration;

use crate::classify::parse_retry_after;

/// A failure reported by the transport layer before any HTTP status was received.
///
/// # Examples
///
/// ```rust
/// use persevere::{Classify, FailureClassification, TransportError};
///
/// assert_eq!(
///     TransportError::TimedOut.classify(),
///     FailureClassification::NetworkTimeout
/// );
/// assert!(!TransportError::CertificateRejected.classify().is_retryable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete in time.
    TimedOut,
    /// An established connection dropped mid-request.
    ConnectionLost,
    /// The device has no network connectivity.
    NotConnected,
    /// DNS resolution failed.
    CannotFindHost,
    /// The host resolved but refused or never accepted the connection.
    CannotConnectToHost,
    /// The server answered with something that is not a valid HTTP response.
    BadServerResponse,
    /// The TLS handshake failed.
    SecureConnectionFailed,
    /// The server presented a certificate that failed validation.
    CertificateRejected,
    /// The response body could not be decoded (compression, charset, ...).
    CannotDecodeContent,
    /// The request was cancelled before it finished.
    Cancelled,
    /// Any other transport failure.
    Other(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimedOut => write!(f, "the request timed out"),
            Self::ConnectionLost => write!(f, "the network connection was lost"),
            Self::NotConnected => write!(f, "not connected to the internet"),
            Self::CannotFindHost => write!(f, "cannot find host"),
            Self::CannotConnectToHost => write!(f, "cannot connect to host"),
            Self::BadServerResponse => write!(f, "bad server response"),
            Self::SecureConnectionFailed => write!(f, "secure connection failed"),
            Self::CertificateRejected => write!(f, "server certificate rejected"),
            Self::CannotDecodeContent => write!(f, "cannot decode content"),
            Self::Cancelled => write!(f, "request cancelled"),
            Self::Other(message) => write!(f, "transport error: {}", message),
        }
    }
}

impl std::error::Error for TransportError {}

/// A failure surfaced by an API client.
///
/// # Examples
///
/// ```rust
/// use persevere::{Classify, FailureClassification, ServiceError};
/// use std::time::Duration;
///
/// let err = ServiceError::from_status_with_header(429, Some("2"));
/// assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
/// assert_eq!(
///     err.classify(),
///     FailureClassification::RateLimited(Some(Duration::from_secs(2)))
/// );
///
/// assert!(!ServiceError::status(404).classify().is_retryable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request never produced an HTTP response.
    Transport(TransportError),
    /// The server answered with a non-success status.
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-supplied `Retry-After` hint, if any.
        retry_after: Option<Duration>,
    },
    /// The response arrived but its payload could not be parsed.
    Decoding(String),
    /// Anything else the client wants to report.
    Other(String),
}

impl ServiceError {
    /// Create a status error without a retry-after hint.
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            retry_after: None,
        }
    }

    /// Create a status error from the raw `Retry-After` header value.
    ///
    /// Unparseable header values are ignored.
    pub fn from_status_with_header(status: u16, retry_after: Option<&str>) -> Self {
        Self::Status {
            status,
            retry_after: retry_after.and_then(parse_retry_after),
        }
    }

    /// Create a 429 error carrying an explicit hint.
    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::Status {
            status: 429,
            retry_after,
        }
    }

    /// The HTTP status, when the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server's retry-after hint, when present.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<TransportError> for ServiceError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::Status {
                status,
                retry_after: Some(after),
            } => write!(f, "HTTP {} (retry after {:?})", status, after),
            Self::Status { status, .. } => write!(f, "HTTP {}", status),
            Self::Decoding(message) => write!(f, "failed to decode response: {}", message),
            Self::Other(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Why a [`RetryPolicy`](crate::RetryPolicy) was rejected by
/// [`validate`](crate::RetryPolicy::validate).
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// `initial_delay` must be greater than zero.
    ZeroInitialDelay,
    /// `max_delay` must be at least `initial_delay`.
    MaxDelayBelowInitial {
        /// Configured initial delay.
        initial_delay: Duration,
        /// Configured cap.
        max_delay: Duration,
    },
    /// `multiplier` must be finite and positive.
    InvalidMultiplier(f64),
    /// `jitter_factor` must lie in `[0, 1]`.
    InvalidJitter(f64),
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroInitialDelay => write!(f, "initial delay must be greater than zero"),
            Self::MaxDelayBelowInitial {
                initial_delay,
                max_delay,
            } => write!(
                f,
                "max delay {:?} is below initial delay {:?}",
                max_delay, initial_delay
            ),
            Self::InvalidMultiplier(m) => {
                write!(f, "multiplier must be finite and positive, got {}", m)
            }
            Self::InvalidJitter(j) => write!(f, "jitter factor must be in [0, 1], got {}", j),
        }
    }
}

impl std::error::Error for PolicyError {}

#[cfg(test)]
mod error_tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_service_error_display() {
        assert_eq!(format!("{}", ServiceError::status(503)), "HTTP 503");
        assert_eq!(
            format!("{}", ServiceError::Transport(TransportError::TimedOut)),
            "the request timed out"
        );
        let limited = ServiceError::rate_limited(Some(Duration::from_secs(3)));
        assert!(format!("{}", limited).contains("retry after"));
    }

    #[test]
    fn test_service_error_source_chains_transport() {
        let err = ServiceError::from(TransportError::CannotFindHost);
        let source = err.source().expect("transport source");
        assert_eq!(source.to_string(), "cannot find host");
        assert!(ServiceError::status(500).source().is_none());
    }

    #[test]
    fn test_from_status_with_header() {
        let err = ServiceError::from_status_with_header(429, Some("120"));
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(120)));

        let garbage = ServiceError::from_status_with_header(429, Some("soon"));
        assert_eq!(garbage.retry_after(), None);

        let absent = ServiceError::from_status_with_header(503, None);
        assert_eq!(absent.retry_after(), None);
    }

    #[test]
    fn test_accessors_on_non_status_errors() {
        let err = ServiceError::Decoding("unexpected token".to_string());
        assert_eq!(err.status_code(), None);
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_policy_error_display() {
        let err = PolicyError::MaxDelayBelowInitial {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(1),
        };
        assert!(format!("{}", err).contains("below initial delay"));
        assert!(format!("{}", PolicyError::InvalidJitter(1.5)).contains("1.5"));
    }
}
