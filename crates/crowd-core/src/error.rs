//! Error types for Crowd operations.
//!
//! Every failure a directory operation can produce is one of a small set of typed
//! variants. Server-reported failures carry an [`ErrorContext`] naming the operation, the
//! HTTP status (when one was received) and the server's message (when one was sent), so
//! callers can branch on [`Error::kind`] and log without re-parsing anything.

use std::fmt;
use thiserror::Error;

/// Longest body excerpt kept in a protocol error message.
pub const MAX_BODY_SNIPPET: usize = 256;

/// Operation name used for failures raised by the HTTP transport itself.
pub const TRANSPORT_OPERATION: &str = "transport";

/// Operation name used when a request body cannot be encoded.
pub const ENCODE_OPERATION: &str = "encode";

/// Operation name used when a response body cannot be decoded.
pub const DECODE_OPERATION: &str = "decode";

/// Context attached to server-reported and protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Name of the directory operation that failed.
    pub operation: &'static str,
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// Message reported by the server or the reason for the failure.
    pub message: Option<String>,
}

impl ErrorContext {
    /// Creates a context for the named operation.
    #[must_use]
    pub const fn new(operation: &'static str) -> Self {
        Self {
            operation,
            status: None,
            message: None,
        }
    }

    /// Attaches the HTTP status code.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches a message when one is present.
    #[must_use]
    pub fn with_optional_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        if let Some(status) = self.status {
            write!(f, " (status {status})")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

/// Main error type for Crowd operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The user or session could not be authenticated
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(ErrorContext),

    /// The server refused to let the application perform the operation
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(ErrorContext),

    /// The user already exists (or is already a member)
    #[error("User already exists: {0}")]
    UserAlreadyExists(ErrorContext),

    /// The referenced user does not exist
    #[error("User not found: {0}")]
    UserNotFound(ErrorContext),

    /// The group already exists
    #[error("Group already exists: {0}")]
    GroupAlreadyExists(ErrorContext),

    /// The referenced group does not exist
    #[error("Group not found: {0}")]
    GroupNotFound(ErrorContext),

    /// Arguments were rejected before any request was sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unexpected status, undecodable body or transport failure
    #[error("Protocol error: {0}")]
    Protocol(ErrorContext),

    /// Client configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Fieldless discriminant of [`Error`] for programmatic branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::AuthenticationFailed`].
    AuthenticationFailed,
    /// See [`Error::AuthorizationDenied`].
    AuthorizationDenied,
    /// See [`Error::UserAlreadyExists`].
    UserAlreadyExists,
    /// See [`Error::UserNotFound`].
    UserNotFound,
    /// See [`Error::GroupAlreadyExists`].
    GroupAlreadyExists,
    /// See [`Error::GroupNotFound`].
    GroupNotFound,
    /// See [`Error::InvalidArgument`].
    InvalidArgument,
    /// See [`Error::Protocol`].
    Protocol,
    /// See [`Error::ConfigError`].
    Config,
}

/// Specialized result type for Crowd operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds a protocol error for an unexpected or undecodable response.
    #[must_use]
    pub fn protocol(operation: &'static str, status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::Protocol(ErrorContext {
            operation,
            status,
            message: Some(detail.into()),
        })
    }

    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            Self::AuthorizationDenied(_) => ErrorKind::AuthorizationDenied,
            Self::UserAlreadyExists(_) => ErrorKind::UserAlreadyExists,
            Self::UserNotFound(_) => ErrorKind::UserNotFound,
            Self::GroupAlreadyExists(_) => ErrorKind::GroupAlreadyExists,
            Self::GroupNotFound(_) => ErrorKind::GroupNotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Self::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
            Self::UserAlreadyExists(_) => "USER_ALREADY_EXISTS",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::GroupAlreadyExists(_) => "GROUP_ALREADY_EXISTS",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Returns the request context, if the error came from a request.
    #[must_use]
    pub const fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::AuthenticationFailed(ctx)
            | Self::AuthorizationDenied(ctx)
            | Self::UserAlreadyExists(ctx)
            | Self::UserNotFound(ctx)
            | Self::GroupAlreadyExists(ctx)
            | Self::GroupNotFound(ctx)
            | Self::Protocol(ctx) => Some(ctx),
            Self::InvalidArgument(_) | Self::ConfigError(_) => None,
        }
    }

    /// Returns the HTTP status code associated with the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.context().and_then(|ctx| ctx.status)
    }

    /// Returns the name of the operation that failed, if known.
    #[must_use]
    pub fn operation(&self) -> Option<&'static str> {
        self.context().map(|ctx| ctx.operation)
    }

    /// Returns the server or failure message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::InvalidArgument(message) | Self::ConfigError(message) => Some(message),
            _ => self.context().and_then(|ctx| ctx.message.as_deref()),
        }
    }

    /// Attributes a protocol error raised below the operation layer to `operation`.
    ///
    /// Errors already naming a directory operation are returned unchanged.
    #[must_use]
    pub fn in_operation(self, operation: &'static str) -> Self {
        match self {
            Self::Protocol(mut ctx)
                if matches!(
                    ctx.operation,
                    TRANSPORT_OPERATION | ENCODE_OPERATION | DECODE_OPERATION
                ) =>
            {
                ctx.operation = operation;
                Self::Protocol(ctx)
            }
            other => other,
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::ConfigError(_))
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|status| status.as_u16());
        let detail = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };
        Self::protocol(TRANSPORT_OPERATION, status, detail)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid URL: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::protocol(DECODE_OPERATION, None, format!("malformed JSON: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// Returns a bounded, lossily decoded excerpt of a response body.
#[must_use]
pub fn body_snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_BODY_SNIPPET {
        return trimmed.to_string();
    }
    let mut snippet: String = trimmed.chars().take(MAX_BODY_SNIPPET).collect();
    snippet.push_str("...");
    snippet
}
