//! Error kind enumeration for categorizing client errors.

/// Categorization of client errors.
///
/// This enum provides a stable interface for matching on error types, enabling
/// different handling strategies for different failure modes.
///
/// ## Retriable vs Non-Retriable
///
/// | ErrorKind             | Retriable | Action                              |
/// |-----------------------|-----------|-------------------------------------|
/// | `Connection`          | Yes       | Reconnect, then resubscribe         |
/// | `Unavailable`         | Yes       | Retry with backoff                  |
/// | `Timeout`             | Yes       | Retry with backoff                  |
/// | `Validation`          | No        | Fix the resource                    |
/// | `UnsupportedVersion`  | No        | Upgrade the client or the peer      |
/// | `UnsupportedResource` | No        | Upgrade the client or the peer      |
/// | `StreamClosed`        | No        | Open a new stream                   |
/// | `InvalidArgument`     | No        | Fix input                           |
///
/// Validation and compatibility errors are fatal to the call, never to the
/// process, and are never retried by the marshaling layer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Transport-level failure (connection refused or reset, TLS handshake,
    /// broken HTTP/2 stream).
    ///
    /// gRPC: UNAVAILABLE with a transport cause, or a client-side send failure
    ///
    /// **Retriable.** Reconnect and reopen the stream.
    #[error("connection error")]
    Connection,

    /// Control plane temporarily unavailable.
    ///
    /// gRPC: UNAVAILABLE, RESOURCE_EXHAUSTED
    ///
    /// **Retriable.** Retry with exponential backoff.
    #[error("service unavailable")]
    Unavailable,

    /// Operation timed out.
    ///
    /// gRPC: DEADLINE_EXCEEDED
    ///
    /// **Retriable.**
    #[error("timeout")]
    Timeout,

    /// Malformed or non-conforming resource (schema violation, empty name,
    /// invalid label key).
    ///
    /// **Not retriable.**
    #[error("validation error")]
    Validation,

    /// The payload or the requested target version is not a version this
    /// client understands for the resource kind.
    ///
    /// **Not retriable.**
    #[error("unsupported version")]
    UnsupportedVersion,

    /// The resource kind has no codec or no wire representation.
    ///
    /// **Not retriable.**
    #[error("unsupported resource")]
    UnsupportedResource,

    /// The peer ended the stream.
    ///
    /// Terminal and informational. A stream closed by the caller carries no
    /// error at all; this kind is only latched when the remote side ended it.
    #[error("stream closed")]
    StreamClosed,

    /// The operation was abandoned because its stream scope was cancelled.
    ///
    /// gRPC: CANCELLED
    #[error("cancelled")]
    Cancelled,

    /// Invalid request argument.
    ///
    /// gRPC: INVALID_ARGUMENT
    #[error("invalid argument")]
    InvalidArgument,

    /// Requested object was not found.
    ///
    /// gRPC: NOT_FOUND
    #[error("not found")]
    NotFound,

    /// Authentication failed.
    ///
    /// gRPC: UNAUTHENTICATED
    #[error("unauthorized")]
    Unauthorized,

    /// Caller lacks permission for the stream.
    ///
    /// gRPC: PERMISSION_DENIED
    #[error("forbidden")]
    Forbidden,

    /// Protocol error (malformed frame, unknown enum value).
    ///
    /// **Not retriable.** May indicate version mismatch or corruption.
    #[error("protocol error")]
    Protocol,

    /// Configuration error (invalid URL, unreadable certificate).
    #[error("configuration error")]
    Configuration,

    /// Internal error on either side.
    #[error("internal error")]
    Internal,

    /// Unknown or unexpected error.
    #[error("unknown error")]
    Unknown,
}

impl ErrorKind {
    /// Returns `true` if this error kind is generally safe to retry.
    ///
    /// # Example
    ///
    /// ```rust
    /// use accessplane::ErrorKind;
    ///
    /// assert!(ErrorKind::Connection.is_retriable());
    /// assert!(!ErrorKind::Validation.is_retriable());
    /// ```
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Connection | ErrorKind::Unavailable | ErrorKind::Timeout
        )
    }

    /// Returns `true` for compatibility mismatches between this client and the
    /// control plane.
    pub fn is_compatibility(&self) -> bool {
        matches!(
            self,
            ErrorKind::UnsupportedVersion | ErrorKind::UnsupportedResource
        )
    }

    /// Returns `true` for errors caused by the caller's input.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::Validation
                | ErrorKind::InvalidArgument
                | ErrorKind::UnsupportedVersion
                | ErrorKind::UnsupportedResource
        )
    }
}
