//! Table-driven mapping from HTTP responses to typed outcomes.
//!
//! Each directory operation owns a [`StatusTable`]: an ordered list of rules that turn a
//! status code into a [`Disposition`]. The same numeric code means different things on
//! different endpoints (a 400 is a failed login on one and a duplicate entity on another),
//! so tables are never shared between operations that disagree.
//!
//! A classified response is either [`Outcome::Success`], [`Outcome::NotFound`], or an
//! [`Error`] whose variant names the failure. Codes that match no rule become
//! [`Error::Protocol`].

use crate::error::{body_snippet, Error, ErrorContext, Result};
use serde::Deserialize;
use tracing::warn;

/// Result of a directory operation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation succeeded with a value.
    Success(T),
    /// The looked-up entity does not exist.
    NotFound,
}

impl<T> Outcome<T> {
    /// Returns true for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true for [`Outcome::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Maps the success value.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::NotFound => Outcome::NotFound,
        }
    }

    /// Maps the success value with a fallible function.
    ///
    /// # Errors
    ///
    /// Returns whatever error `f` returns.
    pub fn try_map<U, F>(self, f: F) -> Result<Outcome<U>>
    where
        F: FnOnce(T) -> Result<U>,
    {
        match self {
            Self::Success(value) => f(value).map(Outcome::Success),
            Self::NotFound => Ok(Outcome::NotFound),
        }
    }

    /// Converts into an `Option`, with `None` as the absent sentinel.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::NotFound => None,
        }
    }
}

impl<T> From<Outcome<T>> for Option<T> {
    fn from(outcome: Outcome<T>) -> Self {
        outcome.into_option()
    }
}

/// Typed failure a status code maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Fails with [`Error::AuthenticationFailed`], surfacing the server message.
    AuthenticationFailed,
    /// Fails with [`Error::AuthorizationDenied`] carrying the given reason.
    AuthorizationDenied(&'static str),
    /// Fails with [`Error::UserAlreadyExists`].
    UserAlreadyExists,
    /// Fails with [`Error::UserNotFound`].
    UserNotFound,
    /// Fails with [`Error::GroupAlreadyExists`].
    GroupAlreadyExists,
    /// Fails with [`Error::GroupNotFound`].
    GroupNotFound,
    /// Either the user or the group is missing; the body message says which.
    MissingMember,
}

/// What the protocol does with a matched status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Return [`Outcome::Success`].
    Success,
    /// Return [`Outcome::NotFound`].
    Absent,
    /// Fail with the given kind.
    Fail(FailureKind),
}

/// Which status codes a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMatch {
    /// Exactly this code.
    Code(u16),
    /// Any 2xx code.
    AnySuccess,
    /// Any code at all.
    Any,
}

impl StatusMatch {
    /// Returns true if the status code matches.
    #[must_use]
    pub const fn matches(self, status: u16) -> bool {
        match self {
            Self::Code(code) => code == status,
            Self::AnySuccess => status >= 200 && status < 300,
            Self::Any => true,
        }
    }
}

/// One row of a status table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRule {
    /// Codes this rule applies to.
    pub matcher: StatusMatch,
    /// What happens when it matches.
    pub disposition: Disposition,
}

impl StatusRule {
    /// Rule for one exact status code.
    #[must_use]
    pub const fn code(code: u16, disposition: Disposition) -> Self {
        Self {
            matcher: StatusMatch::Code(code),
            disposition,
        }
    }

    /// Rule for any 2xx status code.
    #[must_use]
    pub const fn any_success(disposition: Disposition) -> Self {
        Self {
            matcher: StatusMatch::AnySuccess,
            disposition,
        }
    }

    /// Catch-all rule; place it last.
    #[must_use]
    pub const fn otherwise(disposition: Disposition) -> Self {
        Self {
            matcher: StatusMatch::Any,
            disposition,
        }
    }
}

/// Ordered status rules for one operation. The first matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTable {
    operation: &'static str,
    rules: &'static [StatusRule],
}

impl StatusTable {
    /// Creates a table for the named operation.
    #[must_use]
    pub const fn new(operation: &'static str, rules: &'static [StatusRule]) -> Self {
        Self { operation, rules }
    }

    /// Name of the operation this table belongs to.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// Returns the disposition for a status code, or `None` if no rule matches.
    #[must_use]
    pub fn disposition(&self, status: u16) -> Option<Disposition> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(status))
            .map(|rule| rule.disposition)
    }

    /// Classifies a response.
    ///
    /// # Errors
    ///
    /// Returns the typed failure the table assigns to `status`, or [`Error::Protocol`]
    /// when no rule matches.
    pub fn classify(&self, status: u16, body: &[u8]) -> Result<Outcome<()>> {
        match self.disposition(status) {
            Some(Disposition::Success) => Ok(Outcome::Success(())),
            Some(Disposition::Absent) => Ok(Outcome::NotFound),
            Some(Disposition::Fail(kind)) => Err(self.failure(kind, status, body)),
            None => {
                warn!(
                    operation = self.operation,
                    status, "unexpected response from Crowd server"
                );
                Err(self.unexpected(status, body))
            }
        }
    }

    /// Builds the protocol error for a response this table cannot interpret.
    #[must_use]
    pub fn unexpected(&self, status: u16, body: &[u8]) -> Error {
        let snippet = body_snippet(body);
        let detail = if snippet.is_empty() {
            "unexpected response from Crowd server".to_string()
        } else {
            format!("unexpected response from Crowd server: {snippet}")
        };
        Error::protocol(self.operation, Some(status), detail)
    }

    fn failure(&self, kind: FailureKind, status: u16, body: &[u8]) -> Error {
        let message = server_message(body);
        let ctx = ErrorContext::new(self.operation).with_status(status);

        match kind {
            FailureKind::AuthenticationFailed => {
                Error::AuthenticationFailed(ctx.with_optional_message(message))
            }
            FailureKind::AuthorizationDenied(reason) => {
                let reason = match message {
                    Some(message) => format!("{reason}: {message}"),
                    None => reason.to_string(),
                };
                Error::AuthorizationDenied(ctx.with_message(reason))
            }
            FailureKind::UserAlreadyExists => {
                Error::UserAlreadyExists(ctx.with_optional_message(message))
            }
            FailureKind::UserNotFound => Error::UserNotFound(ctx.with_optional_message(message)),
            FailureKind::GroupAlreadyExists => {
                Error::GroupAlreadyExists(ctx.with_optional_message(message))
            }
            FailureKind::GroupNotFound => {
                Error::GroupNotFound(ctx.with_optional_message(message))
            }
            FailureKind::MissingMember => match message {
                Some(message) => {
                    let lowered = message.to_lowercase();
                    if lowered.starts_with("group") {
                        Error::GroupNotFound(ctx.with_message(message))
                    } else if lowered.starts_with("user") {
                        Error::UserNotFound(ctx.with_message(message))
                    } else {
                        Error::Protocol(
                            ctx.with_message(format!("unknown not-found reason: {message}")),
                        )
                    }
                }
                None => self.unexpected(status, body),
            },
        }
    }
}

#[derive(Deserialize)]
struct ServerError {
    #[serde(default)]
    message: Option<String>,
}

/// Extracts the `message` field from a JSON error body.
#[must_use]
pub fn server_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ServerError>(body)
        .ok()
        .and_then(|err| err.message)
        .filter(|message| !message.trim().is_empty())
}
