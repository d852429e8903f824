//! Mapping failures onto the retry taxonomy.
//!
//! Classification is pure and total: every failure maps to exactly one
//! [`FailureClassification`], and anything the classifier does not recognise is
//! [`FailureClassification::NonRetryable`]. Unknown failures are never assumed to be
//! safe to repeat.

use std::time::Duration;

use crate::error::{ServiceError, TransportError};

/// How a failed attempt should be treated by the retry loop.
///
/// # Examples
///
/// ```rust
/// use persevere::{classify_status, FailureClassification};
/// use std::time::Duration;
///
/// assert_eq!(classify_status(502, None), FailureClassification::ServerError(502));
/// assert_eq!(
///     classify_status(429, Some(Duration::from_secs(5))),
///     FailureClassification::RateLimited(Some(Duration::from_secs(5)))
/// );
/// assert_eq!(classify_status(404, None), FailureClassification::NonRetryable);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailureClassification {
    /// The request timed out.
    NetworkTimeout,
    /// The connection could not be made or was dropped.
    ConnectionError,
    /// The server answered with a 5xx status.
    ServerError(u16),
    /// The server answered 429, optionally saying how long to wait.
    RateLimited(Option<Duration>),
    /// Retrying will not help.
    NonRetryable,
}

impl FailureClassification {
    /// Returns true for every classification except [`NonRetryable`](Self::NonRetryable).
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NonRetryable)
    }

    /// The server-supplied wait, for rate-limited failures that carried one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited(after) => *after,
            _ => None,
        }
    }

    /// The HTTP status behind this classification, where one is known.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ServerError(status) => Some(*status),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }
}

impl std::fmt::Display for FailureClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkTimeout => write!(f, "network timeout"),
            Self::ConnectionError => write!(f, "connection error"),
            Self::ServerError(status) => write!(f, "server error ({})", status),
            Self::RateLimited(Some(after)) => write!(f, "rate limited (retry after {:?})", after),
            Self::RateLimited(None) => write!(f, "rate limited"),
            Self::NonRetryable => write!(f, "non-retryable"),
        }
    }
}

/// Errors that know their own retry classification.
///
/// Implement this for an application error type to use it with
/// [`RetryExecutor::execute`](crate::RetryExecutor::execute). Types that cannot
/// implement it can still be retried through
/// [`RetryExecutor::execute_if`](crate::RetryExecutor::execute_if).
///
/// # Examples
///
/// ```rust
/// use persevere::{Classify, FailureClassification};
///
/// #[derive(Debug)]
/// enum LedgerError {
///     Busy,
///     Rejected,
/// }
///
/// impl Classify for LedgerError {
///     fn classify(&self) -> FailureClassification {
///         match self {
///             LedgerError::Busy => FailureClassification::ServerError(503),
///             LedgerError::Rejected => FailureClassification::NonRetryable,
///         }
///     }
/// }
///
/// assert!(LedgerError::Busy.classify().is_retryable());
/// ```
pub trait Classify {
    /// Classify this failure.
    fn classify(&self) -> FailureClassification;
}

impl Classify for TransportError {
    fn classify(&self) -> FailureClassification {
        match self {
            TransportError::TimedOut => FailureClassification::NetworkTimeout,
            TransportError::ConnectionLost
            | TransportError::NotConnected
            | TransportError::CannotFindHost
            | TransportError::CannotConnectToHost => FailureClassification::ConnectionError,
            TransportError::BadServerResponse
            | TransportError::SecureConnectionFailed
            | TransportError::CertificateRejected
            | TransportError::CannotDecodeContent
            | TransportError::Cancelled
            | TransportError::Other(_) => FailureClassification::NonRetryable,
        }
    }
}

impl Classify for ServiceError {
    fn classify(&self) -> FailureClassification {
        match self {
            ServiceError::Transport(e) => e.classify(),
            ServiceError::Status {
                status,
                retry_after,
            } => classify_status(*status, *retry_after),
            ServiceError::Decoding(_) | ServiceError::Other(_) => {
                FailureClassification::NonRetryable
            }
        }
    }
}

impl Classify for std::io::Error {
    fn classify(&self) -> FailureClassification {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::TimedOut => FailureClassification::NetworkTimeout,
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionRefused
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => FailureClassification::ConnectionError,
            _ => match self.get_ref() {
                // io::Error::other(inner) keeps the real failure one level down
                Some(inner) => classify_error(inner),
                None => FailureClassification::NonRetryable,
            },
        }
    }
}

impl Classify for Box<dyn std::error::Error + Send + Sync> {
    fn classify(&self) -> FailureClassification {
        classify_error(&**self)
    }
}

/// Classify an HTTP status code.
///
/// 5xx is a server error, 429 is rate limited (carrying `retry_after`), and every
/// other status is non-retryable.
pub fn classify_status(status: u16, retry_after: Option<Duration>) -> FailureClassification {
    match status {
        429 => FailureClassification::RateLimited(retry_after),
        500..=599 => FailureClassification::ServerError(status),
        _ => FailureClassification::NonRetryable,
    }
}

/// Classify an arbitrary error by walking its `source()` chain.
///
/// The first link that is a [`ServiceError`], [`TransportError`] or
/// [`std::io::Error`] decides. When nothing in the chain is recognised the result is
/// [`FailureClassification::NonRetryable`].
///
/// # Examples
///
/// ```rust
/// use persevere::{classify_error, FailureClassification, TransportError};
///
/// let wrapped = std::io::Error::other(TransportError::ConnectionLost);
/// assert_eq!(classify_error(&wrapped), FailureClassification::ConnectionError);
///
/// let unknown = std::fmt::Error;
/// assert_eq!(classify_error(&unknown), FailureClassification::NonRetryable);
/// ```
pub fn classify_error(error: &(dyn std::error::Error + 'static)) -> FailureClassification {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(e) = err.downcast_ref::<ServiceError>() {
            return e.classify();
        }
        if let Some(e) = err.downcast_ref::<TransportError>() {
            return e.classify();
        }
        if let Some(e) = err.downcast_ref::<std::io::Error>() {
            return e.classify();
        }
        current = err.source();
    }
    FailureClassification::NonRetryable
}

/// Parse a `Retry-After` header value given in delta-seconds.
///
/// Integer and decimal second counts are accepted. HTTP-date values, negative
/// numbers and anything else yield `None`.
///
/// # Examples
///
/// ```rust
/// use persevere::parse_retry_after;
/// use std::time::Duration;
///
/// assert_eq!(parse_retry_after("30"), Some(Duration::from_secs(30)));
/// assert_eq!(parse_retry_after(" 0.5 "), Some(Duration::from_millis(500)));
/// assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
/// ```
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let secs = value.parse::<f64>().ok()?;
    let nanos = (secs * 1_000_000_000.0).round();
    if secs.is_finite() && secs >= 0.0 && nanos <= u64::MAX as f64 {
        Some(Duration::from_nanos(nanos as u64))
    } else {
        None
    }
}
