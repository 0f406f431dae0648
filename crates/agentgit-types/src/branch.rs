use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::{BranchId, NodeId};
use crate::owner::Owner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Active,
    Completed,
    Abandoned,
    Merged,
}

/// A named head pointing at a node. Branches are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub owner: Owner,
    /// Unique within `owner`.
    pub name: String,
    pub head_node_id: Option<NodeId>,
    pub base_node_id: Option<NodeId>,
    pub status: BranchStatus,
    pub intent: String,
    pub status_reason: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub tokens_used: u64,
    pub time_elapsed_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct NewBranch {
    pub owner: Owner,
    pub name: String,
    pub base_node_id: Option<NodeId>,
    pub intent: String,
    pub created_by: String,
}
