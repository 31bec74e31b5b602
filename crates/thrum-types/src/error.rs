use std::fmt;

/// Result type for thrum-types operations and for the error taxonomy shared
/// across every other crate in the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy described by the core's error handling design: each
/// variant maps to one kind of failure a handler can produce, independent of
/// which transport (Unix socket or WebSocket) surfaced the request.
#[derive(Debug)]
pub enum Error {
    /// Malformed identifier, reserved name, name equals role, unknown scope
    /// type. Surfaced verbatim to the caller.
    Validation(String),

    /// Sender has no active session, all recipients unknown, cycle detected
    /// in a group nest. The handler refuses; no event is appended.
    Precondition(String),

    /// Unknown message/session/agent/group.
    NotFound(String),

    /// Duplicate group name, double `session.start` where policy forbids it.
    Conflict(String),

    /// Store busy past its retry budget, socket unavailable.
    Transient(String),

    /// Any other failure: IO, serialization, or a wrapped lower-layer error.
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Error::Precondition(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Error::Transient(msg.into())
    }

    pub fn internal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Internal(Box::new(err))
    }

    /// Stable kind tag used by callers that want to branch on the taxonomy
    /// without matching the full variant (e.g. to pick a JSON-RPC code).
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Precondition(_) => "precondition",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Transient(_) => "transient",
            Error::Internal(_) => "internal",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "validation: {}", msg),
            Error::Precondition(msg) => write!(f, "precondition: {}", msg),
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
            Error::Conflict(msg) => write!(f, "conflict: {}", msg),
            Error::Transient(msg) => write!(f, "transient: {}", msg),
            Error::Internal(err) => write!(f, "internal: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Internal(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(Box::new(err))
    }
}
