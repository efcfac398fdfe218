//! Main error type for the access-plane client.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use super::ErrorKind;

/// The primary error type for client operations.
///
/// `Error` is `Clone` so that a stream's first terminal error can be latched
/// once and handed out to every caller that asks for it afterwards.
///
/// ## Error Hierarchy
///
/// ```text
/// Error
/// ├── kind: ErrorKind          (category for matching)
/// ├── message: String          (human-readable description)
/// └── source: Option           (underlying cause, shared)
/// ```
///
/// ## Example
///
/// ```rust
/// use accessplane::{Error, ErrorKind};
///
/// fn handle_error(err: &Error) {
///     match err.kind() {
///         ErrorKind::Validation => println!("bad resource: {}", err),
///         ErrorKind::StreamClosed => println!("peer ended the stream"),
///         kind if kind.is_retriable() => println!("transient, reconnect"),
///         _ => println!("permanent error: {}", err),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Error {
    /// The error category.
    kind: ErrorKind,

    /// Human-readable error message.
    message: Cow<'static, str>,

    /// The underlying error, if any.
    source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    /// Creates a new error with the given kind and message.
    ///
    /// # Example
    ///
    /// ```rust
    /// use accessplane::{Error, ErrorKind};
    ///
    /// let err = Error::new(ErrorKind::Validation, "missing parameter name");
    /// assert_eq!(err.kind(), ErrorKind::Validation);
    /// ```
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error from a kind with a default message.
    pub fn from_kind(kind: ErrorKind) -> Self {
        let message = match kind {
            ErrorKind::Connection => "connection failed",
            ErrorKind::Unavailable => "service unavailable",
            ErrorKind::Timeout => "operation timed out",
            ErrorKind::Validation => "validation failed",
            ErrorKind::UnsupportedVersion => "unsupported version",
            ErrorKind::UnsupportedResource => "unsupported resource",
            ErrorKind::StreamClosed => "stream closed by peer",
            ErrorKind::Cancelled => "operation cancelled",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotFound => "not found",
            ErrorKind::Unauthorized => "authentication failed",
            ErrorKind::Forbidden => "permission denied",
            ErrorKind::Protocol => "protocol error",
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Internal => "internal error",
            ErrorKind::Unknown => "unknown error",
        };
        Self::new(kind, message)
    }

    /// Returns the error kind for categorization.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message without the kind prefix.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if this error is generally safe to retry.
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }

    /// Sets the source error for this error.
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    // Convenience constructors for common error types

    /// Creates a connection error.
    pub fn connection(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates an unsupported-version error.
    pub fn unsupported_version(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::UnsupportedVersion, message)
    }

    /// Creates an unsupported-resource error.
    pub fn unsupported_resource(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::UnsupportedResource, message)
    }

    /// Creates a stream-closed error.
    pub fn stream_closed() -> Self {
        Self::from_kind(ErrorKind::StreamClosed)
    }

    /// Creates a cancelled error.
    pub fn cancelled() -> Self {
        Self::from_kind(ErrorKind::Cancelled)
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Implement From for common error types

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::from_kind(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::Forbidden,
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::BrokenPipe => ErrorKind::Connection,
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            _ => ErrorKind::Internal,
        };
        Error::new(kind, err.to_string()).with_source(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::configuration(format!("invalid URL: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::validation(format!("malformed resource: {}", err)).with_source(err)
    }
}

#[cfg(feature = "grpc")]
impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        use tonic::Code;

        let kind = match status.code() {
            Code::Ok => ErrorKind::Unknown,
            Code::Cancelled => ErrorKind::Cancelled,
            Code::InvalidArgument | Code::OutOfRange => ErrorKind::InvalidArgument,
            Code::DeadlineExceeded => ErrorKind::Timeout,
            Code::NotFound => ErrorKind::NotFound,
            Code::PermissionDenied => ErrorKind::Forbidden,
            Code::Unauthenticated => ErrorKind::Unauthorized,
            Code::ResourceExhausted => ErrorKind::Unavailable,
            Code::FailedPrecondition => ErrorKind::Validation,
            Code::Unimplemented => ErrorKind::UnsupportedResource,
            Code::Unavailable => ErrorKind::Connection,
            Code::Internal | Code::DataLoss => ErrorKind::Internal,
            Code::AlreadyExists | Code::Aborted | Code::Unknown => ErrorKind::Unknown,
        };
        Error::new(kind, status.message().to_string()).with_source(status)
    }
}

#[cfg(feature = "grpc")]
impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        Error::connection(format!("transport error: {}", err)).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_new() {
        let err = Error::new(ErrorKind::Validation, "test message");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "test message");
        assert!(err.to_string().contains("test message"));
    }

    #[test]
    fn test_error_from_kind() {
        let err = Error::from_kind(ErrorKind::StreamClosed);
        assert_eq!(err.kind(), ErrorKind::StreamClosed);
        assert!(err.to_string().contains("stream closed by peer"));
    }

    #[test]
    fn test_error_clone_keeps_source() {
        let io_err = std::io::Error::other("underlying error");
        let err = Error::connection("send failed").with_source(io_err);
        let cloned = err.clone();
        assert!(cloned.source().is_some());
        assert_eq!(cloned.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_convenience_constructors() {
        assert_eq!(Error::connection("x").kind(), ErrorKind::Connection);
        assert_eq!(Error::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(
            Error::unsupported_version("x").kind(),
            ErrorKind::UnsupportedVersion
        );
        assert_eq!(
            Error::unsupported_resource("x").kind(),
            ErrorKind::UnsupportedResource
        );
        assert_eq!(Error::stream_closed().kind(), ErrorKind::StreamClosed);
        assert_eq!(Error::cancelled().kind(), ErrorKind::Cancelled);
        assert_eq!(Error::invalid_argument("x").kind(), ErrorKind::InvalidArgument);
        assert_eq!(Error::protocol("x").kind(), ErrorKind::Protocol);
        assert_eq!(Error::configuration("x").kind(), ErrorKind::Configuration);
        assert_eq!(Error::internal("x").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.is_retriable());
    }

    #[test]
    fn test_from_json_error_is_validation() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[cfg(feature = "grpc")]
    #[test]
    fn test_from_status() {
        let err: Error = tonic::Status::unavailable("down").into();
        assert_eq!(err.kind(), ErrorKind::Connection);
        let err: Error = tonic::Status::unimplemented("nope").into();
        assert_eq!(err.kind(), ErrorKind::UnsupportedResource);
        let err: Error = tonic::Status::cancelled("bye").into();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }
}
