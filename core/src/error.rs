//! Error types for the Bot API client.
//!
//! # Design
//! Two failure families reach the caller. `ValidationError` is raised before
//! any network I/O when a method call is malformed. `ApiError` covers
//! everything after the request leaves: transport failures, rejected calls
//! (`ok: false` or a non-2xx status) and bodies that cannot be decoded into
//! the method's result shape. Both fold into the top-level `Error`.

use thiserror::Error;

use crate::types::ResponseParameters;

/// Top-level error returned by every dispatched call.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    /// The `ApiError`, if the call got as far as the network.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            Error::Validation(_) => None,
        }
    }
}

/// A malformed or incomplete method call, detected before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The bot token is empty or cannot be placed in a URL path segment.
    #[error("invalid bot token: {0}")]
    InvalidToken(&'static str),

    /// A required field is absent or empty.
    #[error("{method}: missing required field `{field}`")]
    MissingField { method: &'static str, field: String },

    /// A file field holds a value the remote cannot interpret.
    #[error("{method}: unsupported value for file field `{field}`: {reason}")]
    UnsupportedFile {
        method: &'static str,
        field: String,
        reason: &'static str,
    },

    /// A field violates a documented constraint of the method.
    #[error("{method}: invalid field `{field}`: {reason}")]
    InvalidField {
        method: &'static str,
        field: String,
        reason: String,
    },

    /// The parameter struct could not be serialized.
    #[error("{method}: serialization failed: {message}")]
    Serialize { method: &'static str, message: String },
}

/// Where in the exchange an `ApiError` originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The request never produced a response (connect, TLS, timeout...).
    Transport,
    /// The remote answered `ok: false` or with a non-2xx status.
    Rejected,
    /// The response body was not a well-formed envelope for this method.
    Decode,
}

/// The remote rejected the call or the exchange failed.
#[derive(Debug, Clone, Error)]
#[error("{method} failed: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub method: String,
    pub message: String,
    /// HTTP status of the response, when one was received.
    pub http_status: Option<u16>,
    /// `error_code` from the remote envelope, verbatim.
    pub error_code: Option<i64>,
    /// `description` from the remote envelope, verbatim.
    pub description: Option<String>,
    pub parameters: Option<ResponseParameters>,
}

impl ApiError {
    pub(crate) fn transport(method: &str, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Transport,
            method: method.to_string(),
            message: message.into(),
            http_status: None,
            error_code: None,
            description: None,
            parameters: None,
        }
    }

    pub(crate) fn decode(method: &str, http_status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Decode,
            method: method.to_string(),
            message: message.into(),
            http_status: Some(http_status),
            error_code: None,
            description: None,
            parameters: None,
        }
    }

    /// Status of the failure: the remote `error_code` when present, else
    /// the HTTP status.
    pub fn status(&self) -> Option<i64> {
        self.error_code.or(self.http_status.map(i64::from))
    }

    /// Seconds the remote asked the caller to wait, for flood-control errors.
    pub fn retry_after(&self) -> Option<i64> {
        self.parameters.as_ref().and_then(|p| p.retry_after)
    }
}

/// Failure reported by a `Transport` implementation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError(format!("request timed out: {e}"))
        } else {
            TransportError(e.to_string())
        }
    }
}
