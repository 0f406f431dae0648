use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::{ActionType, CallerType};
use crate::owner::Owner;
use crate::value::Value;

/// An opaque integer id assigned by the DAG store. Never reused.
pub type NodeId = i64;
pub type BranchId = i64;

/// One recorded agent action. Immutable once the tracer has inserted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionNode {
    pub id: NodeId,
    pub owner: Owner,
    pub parent_id: Option<NodeId>,
    pub branch_id: BranchId,
    /// Set iff `action_type == Checkpoint`.
    pub checkpoint_sha: Option<String>,
    pub action_type: ActionType,
    pub content: Value,
    pub triggered_by: CallerType,
    pub caller_context: Value,
    pub state_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: Option<u64>,
    pub token_count: Option<u64>,
}

/// Fields needed to insert a new node; the store assigns `id`.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub owner: Owner,
    pub parent_id: Option<NodeId>,
    pub branch_id: BranchId,
    pub checkpoint_sha: Option<String>,
    pub action_type: ActionType,
    pub content: Value,
    pub triggered_by: CallerType,
    pub caller_context: Value,
    pub state_hash: Option<String>,
    pub duration_ms: Option<u64>,
    pub token_count: Option<u64>,
}

impl NewNode {
    pub fn new(
        owner: Owner,
        branch_id: BranchId,
        action_type: ActionType,
        triggered_by: CallerType,
        content: Value,
        caller_context: Value,
    ) -> Self {
        Self {
            owner,
            parent_id: None,
            branch_id,
            checkpoint_sha: None,
            action_type,
            content,
            triggered_by,
            caller_context,
            state_hash: None,
            duration_ms: None,
            token_count: None,
        }
    }
}
