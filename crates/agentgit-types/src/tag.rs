use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::node::NodeId;
use crate::owner::Owner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    Baseline,
    Release,
    Milestone,
    Custom,
}

/// A named ref pointing at a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub owner: Owner,
    /// Unique within `owner`.
    pub tag_name: String,
    pub tag_type: TagType,
    pub node_id: NodeId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
