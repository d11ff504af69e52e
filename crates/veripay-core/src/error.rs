//! Common error type definitions.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Commonly used as a source error in structured error types, wrapping any
/// error that implements the standard `Error` trait while keeping Send and
/// Sync bounds for multi-threaded contexts.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur across veripay operations.
///
/// The first seven variants are the service's user-visible failure taxonomy;
/// the rest cover configuration and plumbing faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A required input was missing or malformed. Never retried.
    InvalidInput,
    /// A chunk expected by the slot table was missing or unreadable at
    /// reassembly time. Fatal to the upload session.
    Integrity,
    /// Scratch storage could not be written or removed.
    Resource,
    /// No identifier pattern was found in any engine's output; the caller
    /// should advise recapturing the image.
    Ambiguous,
    /// The monthly cloud-engine ceiling has been reached.
    QuotaExceeded,
    /// An external collaborator (quota service, verification service,
    /// usage log) was unreachable or returned a malformed response.
    Collaborator,
    /// A recognized identifier does not correspond to any issued
    /// transaction.
    Unverified,
    /// A recognition engine failed outright.
    Engine,
    /// Configuration error.
    Configuration,
    /// Timeout occurred.
    Timeout,
    /// Unknown error occurred.
    Unknown,
}

/// A structured error type for veripay operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new integrity error.
    pub fn integrity() -> Self {
        Self::new(ErrorKind::Integrity)
    }

    /// Creates a new resource error.
    pub fn resource() -> Self {
        Self::new(ErrorKind::Resource)
    }

    /// Creates a new ambiguous-recognition error.
    pub fn ambiguous() -> Self {
        Self::new(ErrorKind::Ambiguous)
    }

    /// Creates a new quota exceeded error.
    pub fn quota_exceeded() -> Self {
        Self::new(ErrorKind::QuotaExceeded)
    }

    /// Creates a new collaborator error.
    pub fn collaborator() -> Self {
        Self::new(ErrorKind::Collaborator)
    }

    /// Creates a new unverified-identifier error.
    pub fn unverified() -> Self {
        Self::new(ErrorKind::Unverified)
    }

    /// Creates a new engine error.
    pub fn engine() -> Self {
        Self::new(ErrorKind::Engine)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new timeout error.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    /// Creates a new unknown error.
    pub fn unknown() -> Self {
        Self::new(ErrorKind::Unknown)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Whether this error is fatal to an upload session.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self.kind, ErrorKind::Integrity | ErrorKind::Resource)
    }
}
