use serde::{Deserialize, Serialize};

/// What a [`crate::ExecutionNode`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    UserInput,
    LlmCall,
    LlmResponse,
    LlmError,
    ToolCall,
    ToolResult,
    ToolError,
    Checkpoint,
    BranchCreate,
    BranchSwitch,
    Backtrack,
    AgentTurnEnd,
}

/// Who (or what) triggered a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerType {
    HumanCli,
    HumanUi,
    AgentTool,
    System,
}
