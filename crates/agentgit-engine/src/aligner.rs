use agentgit_types::AlignStatus;

/// One aligned pair: indices into the baseline/replay sequences, or `None`
/// on the side that has no counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedPair {
    pub baseline_index: Option<usize>,
    pub replay_index: Option<usize>,
    pub status: AlignStatus,
}

/// Aligns two fingerprint sequences by longest common subsequence, then
/// walks both in lockstep emitting matched/added/removed pairs in order.
/// The match set is exactly the LCS pairs, strictly increasing in both
/// indices, so a simple pointer into it tells us how far `i`/`j` must
/// advance with removed/added steps before the next match.
pub fn align(baseline: &[String], replay: &[String]) -> Vec<AlignedPair> {
    let matches = lcs_match_set(baseline, replay);

    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);
    let mut next_match = 0;

    loop {
        if let Some(&(bi, ri)) = matches.get(next_match) {
            if i < bi {
                pairs.push(AlignedPair {
                    baseline_index: Some(i),
                    replay_index: None,
                    status: AlignStatus::Removed,
                });
                i += 1;
                continue;
            }
            if j < ri {
                pairs.push(AlignedPair {
                    baseline_index: None,
                    replay_index: Some(j),
                    status: AlignStatus::Added,
                });
                j += 1;
                continue;
            }
            pairs.push(AlignedPair {
                baseline_index: Some(i),
                replay_index: Some(j),
                status: AlignStatus::Matched,
            });
            i += 1;
            j += 1;
            next_match += 1;
            continue;
        }

        if i < baseline.len() {
            pairs.push(AlignedPair {
                baseline_index: Some(i),
                replay_index: None,
                status: AlignStatus::Removed,
            });
            i += 1;
        } else if j < replay.len() {
            pairs.push(AlignedPair {
                baseline_index: None,
                replay_index: Some(j),
                status: AlignStatus::Added,
            });
            j += 1;
        } else {
            break;
        }
    }
    pairs
}

/// Classic O(mn) LCS dynamic program with backtracking, returning the set
/// of matched index pairs `(baseline_index, replay_index)`.
fn lcs_match_set(baseline: &[String], replay: &[String]) -> Vec<(usize, usize)> {
    let (m, n) = (baseline.len(), replay.len());
    let mut table = vec![vec![0u32; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            table[i][j] = if baseline[i - 1] == replay[j - 1] {
                table[i - 1][j - 1] + 1
            } else {
                table[i - 1][j].max(table[i][j - 1])
            };
        }
    }

    let mut pairs = Vec::new();
    let (mut i, mut j) = (m, n);
    while i > 0 && j > 0 {
        if baseline[i - 1] == replay[j - 1] {
            pairs.push((i - 1, j - 1));
            i -= 1;
            j -= 1;
        } else if table[i - 1][j] >= table[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    pairs.reverse();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn identical_sequences_all_match() {
        let seq = vec![fp("a"), fp("b"), fp("c")];
        let pairs = align(&seq, &seq);
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|p| p.status == AlignStatus::Matched));
    }

    #[test]
    fn extra_replay_step_is_added() {
        let baseline = vec![fp("f1"), fp("f2")];
        let replay = vec![fp("f1"), fp("ftool"), fp("f2")];
        let pairs = align(&baseline, &replay);

        let statuses: Vec<AlignStatus> = pairs.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![AlignStatus::Matched, AlignStatus::Added, AlignStatus::Matched]
        );
    }

    #[test]
    fn lcs_match_count_matches_pair_count() {
        let baseline = vec![fp("a"), fp("x"), fp("b"), fp("c")];
        let replay = vec![fp("a"), fp("b"), fp("y"), fp("c")];
        let pairs = align(&baseline, &replay);
        let matched = pairs.iter().filter(|p| p.status == AlignStatus::Matched).count();
        assert_eq!(matched, 3);
    }

    #[test]
    fn empty_sequences_align_to_nothing() {
        let pairs = align(&[], &[]);
        assert!(pairs.is_empty());
    }
}
