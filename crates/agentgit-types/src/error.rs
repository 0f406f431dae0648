use std::fmt;

/// Result type for agentgit-types operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building or converting the data model.
#[derive(Debug)]
pub enum Error {
    /// A dynamic [`Value`](crate::Value) could not round-trip through JSON.
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
