//! Assertion helpers that read DAG state back out of a `Session`, so
//! integration tests describe what they expect instead of re-deriving
//! query plumbing every time.

use agentgit_sdk::{BranchStatus, Session};
use agentgit_types::{BranchId, ComparisonResult, NodeId, Owner};

#[track_caller]
pub fn assert_branch_head(
    session: &Session,
    owner: &Owner,
    branch_id: BranchId,
    expected: Option<NodeId>,
) {
    let branches = session.list_branches(owner).unwrap();
    let branch = branches
        .into_iter()
        .find(|b| b.id == branch_id)
        .unwrap_or_else(|| panic!("no branch with id {branch_id:?} for {owner:?}"));
    assert_eq!(branch.head_node_id, expected, "unexpected branch head for {branch_id:?}");
}

#[track_caller]
pub fn assert_branch_active(session: &Session, owner: &Owner, name: &str) {
    let branches = session.list_branches(owner).unwrap();
    let branch = branches
        .iter()
        .find(|b| b.name == name)
        .unwrap_or_else(|| panic!("no branch named {name:?} for {owner:?}"));
    assert_eq!(branch.status, BranchStatus::Active, "branch {name:?} is not active");
}

#[track_caller]
pub fn assert_node_count(session: &Session, branch_id: BranchId, expected: usize) {
    let nodes = session.get_branch_nodes(branch_id).unwrap();
    assert_eq!(nodes.len(), expected, "unexpected node count on {branch_id:?}");
}

#[track_caller]
pub fn assert_overall_pass(result: &ComparisonResult, expected: bool) {
    assert_eq!(
        result.overall_pass, expected,
        "expected overall_pass={expected} but got {} (diverged={}, added={}, removed={})",
        result.overall_pass, result.diverged, result.added, result.removed
    );
}
