use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::owner::Owner;
use crate::value::Value;

/// The closed set of event kinds the bus accepts. Exhaustive matches on
/// this type (in the tracer dispatcher) are how the compiler flags a
/// missed kind instead of a silent map-lookup miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserInput,
    LlmCallStart,
    LlmCallEnd,
    LlmStreamChunk,
    LlmStreamEnd,
    LlmError,
    ToolCallStart,
    ToolCallEnd,
    ToolError,
    AgentTurnStart,
    AgentTurnEnd,
    AgentThinking,
}

impl EventKind {
    /// All kinds, in declared order — `subscribe_all` registers a
    /// callback against every one of these.
    pub const ALL: [EventKind; 12] = [
        EventKind::UserInput,
        EventKind::LlmCallStart,
        EventKind::LlmCallEnd,
        EventKind::LlmStreamChunk,
        EventKind::LlmStreamEnd,
        EventKind::LlmError,
        EventKind::ToolCallStart,
        EventKind::ToolCallEnd,
        EventKind::ToolError,
        EventKind::AgentTurnStart,
        EventKind::AgentTurnEnd,
        EventKind::AgentThinking,
    ];

    pub fn index(self) -> usize {
        EventKind::ALL.iter().position(|k| *k == self).expect("EventKind::ALL is exhaustive")
    }
}

/// One event published to the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub owner: Owner,
    pub timestamp: DateTime<Utc>,
    /// Provider-specific identifier of the in-flight LLM/tool call this
    /// event belongs to (the framework adapter's per-`run_id` key).
    pub run_id: Option<String>,
    pub parent_run_id: Option<String>,
    /// Kind-specific fields, e.g. `{"provider": ..., "fingerprint": ...}`
    /// for `LlmCallEnd`.
    pub metadata: Value,
}

impl Event {
    pub fn new(kind: EventKind, owner: Owner) -> Self {
        Self {
            kind,
            owner,
            timestamp: Utc::now(),
            run_id: None,
            parent_run_id: None,
            metadata: Value::object(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}
