use agentgit_types::{AlignStatus, ComparisonResult, MatchType, StepComparison, StepStatus, Value};
use sha2::{Digest, Sha256};

use crate::aligner::AlignedPair;

/// Fields excluded from the structural key-path comparison (provider
/// metadata that varies between otherwise-identical calls).
const IGNORED_STRUCTURAL_KEYS: &[&str] = &["id", "created", "created_at"];

const TEXT_KEYS: &[&str] = &["content", "text"];

/// Optional pluggable semantic-similarity backend. When absent, semantic
/// similarity falls back to a longest-common-subsequence text ratio.
pub trait EmbeddingModel: Send + Sync {
    fn cosine_similarity(&self, a: &str, b: &str) -> f64;
}

pub struct ComparatorConfig {
    /// Combined-score threshold above which a matched-fingerprint pair is
    /// classified `match / similar` rather than `diverge`.
    pub similarity_threshold: f64,
    pub embedding_model: Option<Box<dyn EmbeddingModel>>,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self { similarity_threshold: 0.85, embedding_model: None }
    }
}

/// One LLM call's fingerprint and payload, as seen by the comparator.
pub struct ComparedStep<'a> {
    pub fingerprint: &'a str,
    pub response_data: &'a Value,
}

/// Runs alignment pairs through exact/structural/semantic scoring, then
/// marks cascades from the first detected root cause.
pub fn compare(
    baseline_recording_id: impl Into<String>,
    replay_recording_id: impl Into<String>,
    baseline: &[ComparedStep],
    replay: &[ComparedStep],
    pairs: &[AlignedPair],
    config: &ComparatorConfig,
) -> ComparisonResult {
    let mut steps: Vec<StepComparison> = pairs
        .iter()
        .enumerate()
        .map(|(step_index, pair)| score_pair(step_index, pair, baseline, replay, config))
        .collect();

    mark_cascades(&mut steps);

    let total = steps.len();
    let matched = steps.iter().filter(|s| s.status == StepStatus::Match).count();
    let diverged = steps.iter().filter(|s| s.status == StepStatus::Diverge).count();
    let added = steps.iter().filter(|s| s.status == StepStatus::Add).count();
    let removed = steps.iter().filter(|s| s.status == StepStatus::Remove).count();
    let cascaded = steps.iter().filter(|s| s.status == StepStatus::Cascade).count();
    let root_cause_index = steps
        .iter()
        .position(|s| matches!(s.status, StepStatus::Diverge | StepStatus::Add | StepStatus::Remove))
        .or_else(|| steps.iter().position(|s| s.status == StepStatus::Cascade));
    let overall_pass = diverged == 0 && added == 0 && removed == 0;

    ComparisonResult {
        baseline_recording_id: baseline_recording_id.into(),
        replay_recording_id: replay_recording_id.into(),
        total,
        matched,
        diverged,
        added,
        removed,
        cascaded,
        root_cause_index,
        overall_pass,
        steps,
    }
}

fn score_pair(
    step_index: usize,
    pair: &AlignedPair,
    baseline: &[ComparedStep],
    replay: &[ComparedStep],
    config: &ComparatorConfig,
) -> StepComparison {
    match pair.status {
        AlignStatus::Added => StepComparison {
            step_index,
            baseline_index: None,
            replay_index: pair.replay_index,
            status: StepStatus::Add,
            match_type: None,
            similarity_score: 0.0,
            diff_summary: Some("step present only in replay".to_string()),
            root_cause_index: None,
        },
        AlignStatus::Removed => StepComparison {
            step_index,
            baseline_index: pair.baseline_index,
            replay_index: None,
            status: StepStatus::Remove,
            match_type: None,
            similarity_score: 0.0,
            diff_summary: Some("step present only in baseline".to_string()),
            root_cause_index: None,
        },
        AlignStatus::Matched => {
            let b = &baseline[pair.baseline_index.expect("matched pair has baseline index")];
            let r = &replay[pair.replay_index.expect("matched pair has replay index")];
            score_matched(step_index, pair, b, r, config)
        }
    }
}

fn score_matched(
    step_index: usize,
    pair: &AlignedPair,
    baseline: &ComparedStep,
    replay: &ComparedStep,
    config: &ComparatorConfig,
) -> StepComparison {
    if baseline.fingerprint == replay.fingerprint
        && canonical_sha256(baseline.response_data) == canonical_sha256(replay.response_data)
    {
        return StepComparison {
            step_index,
            baseline_index: pair.baseline_index,
            replay_index: pair.replay_index,
            status: StepStatus::Match,
            match_type: Some(MatchType::Exact),
            similarity_score: 1.0,
            diff_summary: None,
            root_cause_index: None,
        };
    }

    let structural = structural_similarity(baseline.response_data, replay.response_data);
    let semantic = semantic_similarity(baseline.response_data, replay.response_data, config);
    let combined = structural.min(semantic);

    if combined >= config.similarity_threshold {
        StepComparison {
            step_index,
            baseline_index: pair.baseline_index,
            replay_index: pair.replay_index,
            status: StepStatus::Match,
            match_type: Some(MatchType::Similar),
            similarity_score: combined,
            diff_summary: None,
            root_cause_index: None,
        }
    } else {
        StepComparison {
            step_index,
            baseline_index: pair.baseline_index,
            replay_index: pair.replay_index,
            status: StepStatus::Diverge,
            match_type: Some(MatchType::Mismatch),
            similarity_score: combined,
            diff_summary: Some(format!(
                "structural={structural:.2} semantic={semantic:.2}"
            )),
            root_cause_index: None,
        }
    }
}

fn canonical_sha256(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.canonical_json().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Jaccard index on key-path sets (`K`), weighted 0.6, plus the fraction
/// of shared keys whose value-type names agree (`T`), weighted 0.4.
fn structural_similarity(a: &Value, b: &Value) -> f64 {
    let keys_a: std::collections::BTreeSet<String> =
        a.key_paths(IGNORED_STRUCTURAL_KEYS).into_iter().collect();
    let keys_b: std::collections::BTreeSet<String> =
        b.key_paths(IGNORED_STRUCTURAL_KEYS).into_iter().collect();

    if keys_a.is_empty() && keys_b.is_empty() {
        return 1.0;
    }

    let intersection: Vec<&String> = keys_a.intersection(&keys_b).collect();
    let union_len = keys_a.union(&keys_b).count();
    let k = if union_len == 0 { 1.0 } else { intersection.len() as f64 / union_len as f64 };

    let t = if intersection.is_empty() {
        0.0
    } else {
        let agreeing = intersection
            .iter()
            .filter(|path| value_type_at_path(a, path) == value_type_at_path(b, path))
            .count();
        agreeing as f64 / intersection.len() as f64
    };

    0.6 * k + 0.4 * t
}

fn value_type_at_path<'a>(value: &'a Value, path: &str) -> Option<&'static str> {
    let mut current = value;
    for segment in path.split('.') {
        let (key, index) = match segment.split_once('[') {
            Some((k, rest)) => (k, rest.trim_end_matches(']').parse::<usize>().ok()),
            None => (segment, None),
        };
        if !key.is_empty() {
            current = current.get(key)?;
        }
        if let Some(i) = index {
            current = current.as_array()?.get(i)?;
        }
    }
    Some(current.type_name())
}

fn semantic_similarity(a: &Value, b: &Value, config: &ComparatorConfig) -> f64 {
    let text_a = a.collect_text_under(TEXT_KEYS).join(" ");
    let text_b = b.collect_text_under(TEXT_KEYS).join(" ");

    if text_a.is_empty() || text_b.is_empty() {
        return 0.0;
    }

    match &config.embedding_model {
        Some(model) => model.cosine_similarity(&text_a, &text_b),
        None => lcs_text_ratio(&text_a, &text_b),
    }
}

/// Longest-common-subsequence ratio over whitespace tokens, used as the
/// default semantic-similarity fallback with no embedding model wired.
fn lcs_text_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let (m, n) = (tokens_a.len(), tokens_b.len());
    let mut table = vec![vec![0u32; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            table[i][j] = if tokens_a[i - 1] == tokens_b[j - 1] {
                table[i - 1][j - 1] + 1
            } else {
                table[i - 1][j].max(table[i][j - 1])
            };
        }
    }
    let lcs_len = table[m][n] as f64;
    lcs_len / m.max(n) as f64
}

/// Reclassifies every `diverge` step after the first divergence/add/remove
/// (the root cause) to `cascade`; `add`/`remove` downstream are untouched.
fn mark_cascades(steps: &mut [StepComparison]) {
    let root_cause = steps
        .iter()
        .position(|s| matches!(s.status, StepStatus::Diverge | StepStatus::Add | StepStatus::Remove));

    let Some(root_cause) = root_cause else { return };

    for step in steps.iter_mut().skip(root_cause + 1) {
        if step.status == StepStatus::Diverge {
            step.status = StepStatus::Cascade;
            step.root_cause_index = Some(root_cause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::align;
    use crate::fingerprint::compute_fingerprint;

    fn step<'a>(fingerprint: &'a str, content: &'a Value) -> ComparedStep<'a> {
        ComparedStep { fingerprint, response_data: content }
    }

    #[test]
    fn empty_recordings_pass_trivially() {
        let pairs = align(&[], &[]);
        let result = compare("b", "r", &[], &[], &pairs, &ComparatorConfig::default());
        assert!(result.overall_pass);
        assert_eq!(result.total, 0);
    }

    #[test]
    fn identical_single_call_is_exact_match() {
        let fp = compute_fingerprint("openai", "chat.completions.create", "gpt-4", &["user".into()], &[]);
        let mut response = Value::object();
        response.insert("content", Value::from("hi"));

        let baseline = vec![step(&fp, &response)];
        let replay = vec![step(&fp, &response)];
        let pairs = align(&[fp.clone()], &[fp.clone()]);

        let result = compare("b", "r", &baseline, &replay, &pairs, &ComparatorConfig::default());
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].status, StepStatus::Match);
        assert_eq!(result.steps[0].match_type, Some(MatchType::Exact));
        assert_eq!(result.steps[0].similarity_score, 1.0);
    }

    #[test]
    fn punctuation_only_difference_is_similar_match() {
        let fp = compute_fingerprint("openai", "chat.completions.create", "gpt-4", &["user".into()], &[]);
        let mut a = Value::object();
        a.insert("content", Value::from("Hello, world"));
        let mut b = Value::object();
        b.insert("content", Value::from("Hello world"));

        let baseline = vec![step(&fp, &a)];
        let replay = vec![step(&fp, &b)];
        let pairs = align(&[fp.clone()], &[fp.clone()]);

        let result = compare("b", "r", &baseline, &replay, &pairs, &ComparatorConfig::default());
        assert_eq!(result.steps[0].status, StepStatus::Match);
        assert_eq!(result.steps[0].match_type, Some(MatchType::Similar));
        assert!(result.steps[0].similarity_score >= 0.85 && result.steps[0].similarity_score < 1.0);
    }

    #[test]
    fn extra_tool_call_is_marked_add_with_root_cause() {
        let f1 = "f1".to_string();
        let f2 = "f2".to_string();
        let ftool = "ftool".to_string();
        let resp = Value::object();

        let baseline = vec![step(&f1, &resp), step(&f2, &resp)];
        let replay = vec![step(&f1, &resp), step(&ftool, &resp), step(&f2, &resp)];
        let pairs = align(
            &[f1.clone(), f2.clone()],
            &[f1.clone(), ftool.clone(), f2.clone()],
        );

        let result = compare("b", "r", &baseline, &replay, &pairs, &ComparatorConfig::default());
        assert_eq!(result.total, 3);
        assert_eq!(result.matched, 2);
        assert_eq!(result.added, 1);
        assert_eq!(result.root_cause_index, Some(1));
        assert!(!result.overall_pass);
    }

    #[test]
    fn cascading_divergence_marks_first_as_root_cause() {
        let fp = "shared".to_string();
        let mut a = Value::object();
        a.insert("content", Value::from("alpha"));
        let mut b = Value::object();
        b.insert("content", Value::from("totally different text that shares nothing"));

        let baseline = vec![step(&fp, &a), step(&fp, &a), step(&fp, &a)];
        let replay = vec![step(&fp, &b), step(&fp, &b), step(&fp, &b)];
        let pairs = align(
            &[fp.clone(), fp.clone(), fp.clone()],
            &[fp.clone(), fp.clone(), fp.clone()],
        );

        let result = compare("b", "r", &baseline, &replay, &pairs, &ComparatorConfig::default());
        assert_eq!(result.steps[0].status, StepStatus::Diverge);
        assert_eq!(result.steps[1].status, StepStatus::Cascade);
        assert_eq!(result.steps[2].status, StepStatus::Cascade);
        assert_eq!(result.root_cause_index, Some(0));
        assert_eq!(result.cascaded, 2);
    }
}
