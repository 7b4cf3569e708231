//! The result convention shared by every facade operation.
//!
//! An operation either succeeds with its payload or fails with an
//! [`OperationFailure`]; there is no partially populated middle ground. The
//! failure always carries a [`FailureKind`], a human-readable description
//! naming the action that failed, and (where one exists) the identifier the
//! call targeted.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Outcome of a facade operation.
pub type OperationResult<T> = Result<T, OperationFailure>;

/// Why an operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    /// The backend answered with a status outside the operation's success set.
    #[error("backend rejected {path} with status {status}")]
    RemoteRejected { status: u16, path: String },

    /// Connection, DNS, TLS or timeout fault before a status was observed.
    #[error("transport failure: {message}")]
    TransportFailure { message: String },

    /// The body did not have the expected shape.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// A bounded poll ran out of attempts or time.
    #[error("gave up after {attempts} attempts ({elapsed_ms}ms)")]
    Timeout { attempts: u32, elapsed_ms: u64 },

    /// The caller's cancellation signal fired.
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl FailureKind {
    pub fn remote_rejected(status: u16, path: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status,
            path: path.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure { message: message.into() }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse { reason: reason.into() }
    }

    /// Stable label used in serialized reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RemoteRejected { .. } => "remote_rejected",
            Self::TransportFailure { .. } => "transport_failure",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Failed outcome of a facade operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{description}: {kind}")]
pub struct OperationFailure {
    kind: FailureKind,
    description: String,
    context: Option<String>,
}

impl OperationFailure {
    pub fn new(kind: FailureKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            context: None,
        }
    }

    /// Attach the identifier (workflow id, atomic service id) the call targeted.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// HTTP status reported by the backend, if the failure was a rejection.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FailureKind::RemoteRejected { status, .. } => Some(status),
            _ => None,
        }
    }

    /// Normalized error code: the HTTP status for rejections, the kind label
    /// for everything else.
    pub fn code(&self) -> String {
        match self.status() {
            Some(status) => status.to_string(),
            None => self.kind.label().to_string(),
        }
    }
}

#[derive(Serialize)]
struct FailureReport<'a> {
    description: &'a str,
    code: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
    detail: String,
}

impl Serialize for OperationFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FailureReport {
            description: &self.description,
            code: self.code(),
            kind: self.kind.label(),
            context: self.context.as_deref(),
            detail: self.kind.to_string(),
        }
        .serialize(serializer)
    }
}
