use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Error type for SDK operations. Wraps the daemon's taxonomy as-is and
/// adds the handful of failure modes specific to being a client: a
/// malformed socket response, or a disconnect mid-request.
#[derive(Debug)]
pub enum Error {
    /// The daemon's own error taxonomy (validation, precondition, not
    /// found, conflict, transient, internal).
    Daemon(thrum_types::Error),
    /// The socket transport dropped, refused the connection, or returned
    /// a response that didn't parse as JSON-RPC.
    Transport(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Daemon(err) => write!(f, "{err}"),
            Error::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Daemon(err) => Some(err),
            Error::Transport(_) => None,
        }
    }
}

impl From<thrum_types::Error> for Error {
    fn from(err: thrum_types::Error) -> Self {
        Error::Daemon(err)
    }
}
