//! Error types and the failure classifier for the OZmap client.
//!
//! # Design
//! Every failed call is reduced to an [`OzError`] whose [`ErrorKind`] is one
//! of a closed set. Callers match on the kind instead of on HTTP details.
//! [`classify`] is pure: it takes a [`Failure`] (what went wrong on the wire)
//! plus a locale and returns the classified error. Only transport failures
//! that fit no known category are logged before being wrapped.
//!
//! Failures that never reach the service (bad payloads, id-map file access,
//! configuration) use the other variants of [`Error`].

use std::fmt;

use thiserror::Error;

use crate::http::HttpResponse;
use crate::i18n::{message, Locale, MessageKey};

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the OZmap client.
#[derive(Debug, Error)]
pub enum Error {
    /// The call reached (or tried to reach) OZmap and failed.
    #[error(transparent)]
    Api(#[from] OzError),

    /// A payload or response body could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading or writing a local file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The client configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Pagination gave up after the configured number of page requests.
    #[error("pagination stopped after {pages} pages without a termination signal")]
    PageLimitExceeded { pages: u32 },
}

impl Error {
    /// Kind of the classified service error, if this is one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Api(err) => Some(err.kind),
            _ => None,
        }
    }
}

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    UnprocessableEntity,
    ConnectionRefused,
    InternalServerError,
    /// A 4xx status with no dedicated kind; carries the status code.
    Unexpected(u16),
}

impl ErrorKind {
    /// Status code conventionally associated with the kind.
    pub fn code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Unauthorized => 401,
            ErrorKind::UnprocessableEntity => 422,
            ErrorKind::ConnectionRefused | ErrorKind::InternalServerError => 500,
            ErrorKind::Unexpected(code) => *code,
        }
    }

    fn message_key(&self) -> MessageKey {
        match self {
            ErrorKind::NotFound => MessageKey::NotFound,
            ErrorKind::Unauthorized => MessageKey::Unauthorized,
            ErrorKind::UnprocessableEntity => MessageKey::UnprocessableEntity,
            ErrorKind::ConnectionRefused => MessageKey::ServiceUnavailable,
            ErrorKind::InternalServerError => MessageKey::InternalServerError,
            ErrorKind::Unexpected(_) => MessageKey::UnexpectedError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => f.write_str("not found"),
            ErrorKind::Unauthorized => f.write_str("unauthorized"),
            ErrorKind::UnprocessableEntity => f.write_str("unprocessable entity"),
            ErrorKind::ConnectionRefused => f.write_str("connection refused"),
            ErrorKind::InternalServerError => f.write_str("internal server error"),
            ErrorKind::Unexpected(code) => write!(f, "unexpected status {code}"),
        }
    }
}

/// A classified service error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct OzError {
    pub kind: ErrorKind,
    pub message: String,
    /// Status of the HTTP response, when one was received.
    pub http_status: Option<u16>,
}

impl OzError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
        }
    }

    /// Error of `kind` carrying the catalogue message for `locale`.
    pub fn localized(kind: ErrorKind, locale: Locale) -> Self {
        Self::new(kind, message(kind.message_key(), locale))
    }

    pub fn code(&self) -> u16 {
        self.kind.code()
    }
}

/// Connection-level failure categories reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionRefused,
    ConnectionReset,
    Timeout,
    Other,
}

/// A call that produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {detail}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Raw outcome of a failed call, before classification.
#[derive(Debug, Clone)]
pub enum Failure {
    Classified(OzError),
    Transport(TransportError),
    Status(HttpResponse),
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Failure::Transport(err)
    }
}

impl From<OzError> for Failure {
    fn from(err: OzError) -> Self {
        Failure::Classified(err)
    }
}

/// Classify a failed call. Rules apply in order: already classified,
/// refused/reset connection, timeout, HTTP status, anything else.
pub fn classify(failure: Failure, locale: Locale) -> OzError {
    match failure {
        Failure::Classified(err) => err,
        Failure::Transport(err) => match err.kind {
            TransportErrorKind::ConnectionRefused | TransportErrorKind::ConnectionReset => {
                OzError::new(
                    ErrorKind::ConnectionRefused,
                    message(MessageKey::ServiceUnavailable, locale),
                )
            }
            TransportErrorKind::Timeout => OzError::new(
                ErrorKind::InternalServerError,
                message(MessageKey::ServiceUnavailable, locale),
            ),
            TransportErrorKind::Other => {
                log::error!("[ERROR] Request failed without a response: {}", err.detail);
                OzError::new(
                    ErrorKind::InternalServerError,
                    message(MessageKey::ServiceUnavailable, locale),
                )
            }
        },
        Failure::Status(response) => {
            let kind = kind_for_status(response.status);
            if let ErrorKind::Unexpected(code) = kind {
                log::warn!("[ERROR] Unexpected status code from OZmap: {code}");
            }
            let text = response_message(&response)
                .unwrap_or_else(|| message(kind.message_key(), locale).to_string());
            OzError {
                kind,
                message: text,
                http_status: Some(response.status),
            }
        }
    }
}

/// Map an HTTP status to its error kind.
pub fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        404 => ErrorKind::NotFound,
        422 => ErrorKind::UnprocessableEntity,
        401 => ErrorKind::Unauthorized,
        400..=499 => ErrorKind::Unexpected(status),
        _ => ErrorKind::InternalServerError,
    }
}

/// Server-provided message: the JSON body's `message` field, else the body
/// text.
fn response_message(response: &HttpResponse) -> Option<String> {
    if let Ok(body) = serde_json::from_slice::<serde_json::Value>(&response.body) {
        if let Some(msg) = body.get("message").and_then(|m| m.as_str()) {
            if !msg.trim().is_empty() {
                return Some(msg.to_string());
            }
        }
    }
    let text = response.text();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
