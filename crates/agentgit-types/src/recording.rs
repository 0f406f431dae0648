use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::{BranchId, NodeId};
use crate::owner::Owner;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    InProgress,
    Completed,
    Failed,
}

/// A named branch collecting LLM-call sidecars during a test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub recording_id: String,
    pub name: String,
    pub owner: Owner,
    /// 1-to-1 with an agentgit branch.
    pub branch_id: BranchId,
    pub status: RecordingStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub step_count: u32,
    pub error: Option<String>,
    pub config_snapshot: Value,
    pub metadata: Value,
}

/// Sidecar row attached to an `LLM_CALL_END` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallDetail {
    pub id: i64,
    /// 1-to-1 with an LLM_CALL_END node.
    pub node_id: NodeId,
    pub recording_id: String,
    /// 0-based, monotonic within the recording.
    pub step_index: u32,
    pub provider: String,
    pub method: String,
    pub model: String,
    /// 16-hex-char structural fingerprint.
    pub fingerprint: String,
    pub request_params: Value,
    pub response_data: Value,
    pub is_streaming: bool,
    pub stream_id: Option<String>,
    pub duration_ms: Option<u64>,
    pub token_usage: Option<Value>,
    pub error: Option<String>,
    pub metadata: Value,
}
