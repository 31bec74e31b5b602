use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Index(thrum_index::Error),
    Journal(thrum_journal::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Index(err) => write!(f, "projection store error: {err}"),
            Error::Journal(err) => write!(f, "journal error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Journal(err) => Some(err),
        }
    }
}

impl From<thrum_index::Error> for Error {
    fn from(err: thrum_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<thrum_journal::Error> for Error {
    fn from(err: thrum_journal::Error) -> Self {
        Error::Journal(err)
    }
}

impl From<Error> for thrum_types::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Index(err) => err.into(),
            Error::Journal(err) => err.into(),
        }
    }
}
