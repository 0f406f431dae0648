use serde::{Deserialize, Serialize};

/// Per-step verdict after alignment and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Match,
    Diverge,
    Add,
    Remove,
    Cascade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Similar,
    Mismatch,
    Unknown,
}

/// The aligner's raw alignment verdict for one pair, before the
/// comparator assigns a [`StepStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignStatus {
    Matched,
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepComparison {
    pub step_index: usize,
    pub baseline_index: Option<usize>,
    pub replay_index: Option<usize>,
    pub status: StepStatus,
    pub match_type: Option<MatchType>,
    pub similarity_score: f64,
    pub diff_summary: Option<String>,
    pub root_cause_index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub baseline_recording_id: String,
    pub replay_recording_id: String,
    pub total: usize,
    pub matched: usize,
    pub diverged: usize,
    pub added: usize,
    pub removed: usize,
    pub cascaded: usize,
    pub root_cause_index: Option<usize>,
    pub overall_pass: bool,
    pub steps: Vec<StepComparison>,
}
