use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Store(agentgit_store::Error),
    Core(agentgit_core::Error),
    Bus(agentgit_bus::Error),
    Engine(agentgit_engine::Error),
    /// A branch, checkpoint or recording id the caller referenced does
    /// not exist.
    NotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "store error: {err}"),
            Error::Core(err) => write!(f, "core error: {err}"),
            Error::Bus(err) => write!(f, "bus error: {err}"),
            Error::Engine(err) => write!(f, "engine error: {err}"),
            Error::NotFound(what) => write!(f, "not found: {what}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Core(err) => Some(err),
            Error::Bus(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::NotFound(_) => None,
        }
    }
}

impl From<agentgit_store::Error> for Error {
    fn from(err: agentgit_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<agentgit_core::Error> for Error {
    fn from(err: agentgit_core::Error) -> Self {
        Error::Core(err)
    }
}

impl From<agentgit_bus::Error> for Error {
    fn from(err: agentgit_bus::Error) -> Self {
        Error::Bus(err)
    }
}

impl From<agentgit_engine::Error> for Error {
    fn from(err: agentgit_engine::Error) -> Self {
        Error::Engine(err)
    }
}
