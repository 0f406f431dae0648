use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Store(agentgit_store::Error),
    Bus(agentgit_bus::Error),
    /// Operation requires an active branch/recording for the owner and
    /// none exists.
    NoActiveRecording,
    UnknownRunId(String),
    /// A comparison was requested over a recording with no steps.
    EmptyRecording(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "store error: {err}"),
            Error::Bus(err) => write!(f, "bus error: {err}"),
            Error::NoActiveRecording => write!(f, "no active recording"),
            Error::UnknownRunId(id) => write!(f, "unknown run_id: {id}"),
            Error::EmptyRecording(id) => write!(f, "recording {id} has no steps"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Bus(err) => Some(err),
            Error::NoActiveRecording | Error::UnknownRunId(_) | Error::EmptyRecording(_) => None,
        }
    }
}

impl From<agentgit_store::Error> for Error {
    fn from(err: agentgit_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<agentgit_bus::Error> for Error {
    fn from(err: agentgit_bus::Error) -> Self {
        Error::Bus(err)
    }
}
