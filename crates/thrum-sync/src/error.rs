use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Serde(serde_json::Error),
    /// `git` exited non-zero; carries the subcommand and stderr for logging.
    GitFailed { command: String, stderr: String },
    LockHeld,
    NoRemote,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "sync IO error: {err}"),
            Error::Serde(err) => write!(f, "sync record error: {err}"),
            Error::GitFailed { command, stderr } => {
                write!(f, "git {command} failed: {}", stderr.trim())
            }
            Error::LockHeld => write!(f, "another sync is already in progress"),
            Error::NoRemote => write!(f, "no sync remote is configured"),
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
            Error::LockHeld => thrum_types::Error::transient(err.to_string()),
            other => thrum_types::Error::internal(other),
        }
    }
}
