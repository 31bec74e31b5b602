use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Core(thrum_types::Error),
    Journal(thrum_journal::Error),
    Index(thrum_index::Error),
    Engine(thrum_engine::Error),
    Sync(thrum_sync::Error),
    Io(std::io::Error),
    Config(String),
    NotInitialized(String),
    InvalidOperation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Core(err) => write!(f, "{err}"),
            Error::Journal(err) => write!(f, "{err}"),
            Error::Index(err) => write!(f, "{err}"),
            Error::Engine(err) => write!(f, "{err}"),
            Error::Sync(err) => write!(f, "{err}"),
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::NotInitialized(msg) => write!(f, "not initialized: {msg}"),
            Error::InvalidOperation(msg) => write!(f, "invalid operation: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Core(err) => Some(err),
            Error::Journal(err) => Some(err),
            Error::Index(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::Sync(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<thrum_types::Error> for Error {
    fn from(err: thrum_types::Error) -> Self {
        Error::Core(err)
    }
}

impl From<thrum_journal::Error> for Error {
    fn from(err: thrum_journal::Error) -> Self {
        Error::Journal(err)
    }
}

impl From<thrum_index::Error> for Error {
    fn from(err: thrum_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<thrum_engine::Error> for Error {
    fn from(err: thrum_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<thrum_sync::Error> for Error {
    fn from(err: thrum_sync::Error) -> Self {
        Error::Sync(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Core(thrum_types::Error::internal(err))
    }
}

impl From<Error> for thrum_types::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(err) => err,
            Error::Journal(err) => err.into(),
            Error::Index(err) => err.into(),
            Error::Engine(err) => err.into(),
            Error::Sync(err) => err.into(),
            Error::Io(err) => thrum_types::Error::internal(err),
            Error::Config(msg) => thrum_types::Error::validation(msg),
            Error::NotInitialized(msg) => thrum_types::Error::precondition(msg),
            Error::InvalidOperation(msg) => thrum_types::Error::precondition(msg),
        }
    }
}
