use serde::{Deserialize, Serialize};

/// The isolation key for every owned row in the system. No query ever
/// joins across two different owners.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub user_id: String,
    pub session_id: String,
}

impl Owner {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    /// The sentinel owner used for CLI convenience: workspace selection
    /// falls back to the project directory for this owner (see
    /// `agentgit-core::path`).
    pub fn default_sentinel() -> Self {
        Self::new("default", "default")
    }

    pub fn is_default_sentinel(&self) -> bool {
        self.user_id == "default" && self.session_id == "default"
    }
}
