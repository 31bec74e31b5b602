use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Serde(serde_json::Error),
    /// A single journal line exceeded the 1 MiB guard; the file is almost
    /// certainly corrupt past this point.
    LineTooLong { path: String, limit: usize },
    /// Failed to acquire the per-file advisory append lock within budget.
    LockContention { path: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "journal IO error: {err}"),
            Error::Serde(err) => write!(f, "journal record error: {err}"),
            Error::LineTooLong { path, limit } => {
                write!(f, "journal line in {path} exceeds {limit} bytes")
            }
            Error::LockContention { path } => {
                write!(f, "timed out waiting for append lock on {path}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<Error> for thrum_types::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::LockContention { .. } => thrum_types::Error::transient(err.to_string()),
            other => thrum_types::Error::internal(other),
        }
    }
}
