use std::path::PathBuf;
use std::sync::Arc;

use agentgit_bus::{EventBus, Subscriber};
use agentgit_core::Layout;
use agentgit_engine::{FrameworkAdapter, RecordingSession, Tracer};
use agentgit_store::{DagStore, SnapshotStore};
use agentgit_types::{
    Branch, BranchId, Checkpoint, ComparisonResult, Event, EventKind, ExecutionNode,
    LlmCallDetail, NewBranch, NewNode, NodeId, Owner, Recording, Tag, TagType, Value,
};

use crate::error::{Error, Result};

/// Owns the bus, the DAG store and the snapshot store, wiring the tracer
/// and recording session in as subscribers at construction time. This is
/// the one type embedders hold; everything else in the workspace is
/// reached through it.
pub struct Session {
    layout: Layout,
    bus: EventBus,
    store: DagStore,
    snapshots: SnapshotStore,
    recording: Arc<RecordingSession>,
    adapter: FrameworkAdapter,
}

impl Session {
    /// Opens (creating if absent) `<root>/.agentgit/{dag.sqlite,
    /// snapshots.git, workspaces/}` and wires the tracer and recording
    /// session onto a fresh bus. The tracer is registered first so the
    /// recording session always observes the node it just appended.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = Layout::new(root);
        layout.ensure()?;

        let store = DagStore::open(&layout.dag_sqlite())?;
        let snapshots = SnapshotStore::open(layout.snapshots_git())?;
        let recording = Arc::new(RecordingSession::new());
        let adapter = FrameworkAdapter::new();

        let mut bus = EventBus::new();
        bus.subscribe_all(Arc::new(Tracer::new()));
        bus.subscribe(EventKind::LlmCallEnd, recording.clone());

        Ok(Self { layout, bus, store, snapshots, recording, adapter })
    }

    fn connection(&self) -> &rusqlite::Connection {
        self.store.connection()
    }

    // -- branches ---------------------------------------------------

    pub fn create_branch(
        &self,
        owner: &Owner,
        name: impl Into<String>,
        base_node_id: Option<NodeId>,
        intent: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Result<BranchId> {
        let branch_id = self.store.create_branch(&NewBranch {
            owner: owner.clone(),
            name: name.into(),
            base_node_id,
            intent: intent.into(),
            created_by: created_by.into(),
        })?;
        Ok(branch_id)
    }

    pub fn list_branches(&self, owner: &Owner) -> Result<Vec<Branch>> {
        Ok(self.store.list_branches(owner)?)
    }

    // -- nodes --------------------------------------------------------

    pub fn peek(&self, node_id: NodeId) -> Result<Option<ExecutionNode>> {
        Ok(self.store.get_node(node_id)?)
    }

    /// Walks `parent_id` links from `node_id` to the root, root-first.
    pub fn get_history(&self, node_id: NodeId) -> Result<Vec<ExecutionNode>> {
        Ok(self.store.get_path_to_root(node_id)?)
    }

    pub fn get_branch_nodes(&self, branch_id: BranchId) -> Result<Vec<ExecutionNode>> {
        Ok(self.store.get_branch_nodes(branch_id)?)
    }

    // -- events ---------------------------------------------------------

    /// Registers an additional subscriber for `kind`, run after the
    /// tracer/recording session in call order.
    pub fn on(&mut self, kind: EventKind, subscriber: Arc<dyn Subscriber>) {
        self.bus.subscribe(kind, subscriber);
    }

    pub fn emit_user_input(
        &self,
        owner: &Owner,
        message: impl Into<String>,
        metadata: Value,
    ) -> Result<()> {
        let mut payload = match metadata {
            Value::Map(m) => Value::Map(m),
            _ => Value::object(),
        };
        payload.insert("message", Value::from(message.into()));

        let event = Event::new(EventKind::UserInput, owner.clone()).with_metadata(payload);
        self.bus.publish(&event, Some(self.connection()))?;
        Ok(())
    }

    // -- framework adapter --------------------------------------------

    /// A chat-model-start callback from an orchestration framework. See
    /// [`FrameworkAdapter::on_llm_start`] for owner resolution rules.
    #[allow(clippy::too_many_arguments)]
    pub fn on_llm_start(
        &self,
        run_id: &str,
        parent_run_id: Option<&str>,
        class_name: &str,
        model: &str,
        messages: &Value,
        invocation_params: &Value,
        configurable: Option<&Owner>,
        metadata_owner: Option<&Owner>,
    ) -> Owner {
        self.adapter.on_llm_start(
            run_id,
            parent_run_id,
            class_name,
            model,
            messages,
            invocation_params,
            configurable,
            metadata_owner,
        )
    }

    /// A chat-model-end callback, publishing `LLM_CALL_END` bound to the
    /// same connection every other production event uses, so the tracer's
    /// node insert and the recording session's sidecar insert commit (or
    /// roll back) atomically with it.
    pub fn on_llm_end(&self, run_id: &str, response_data: &Value) -> Result<()> {
        Ok(self.adapter.on_llm_end(&self.bus, self.connection(), run_id, response_data)?)
    }

    /// A chat-model-error callback, publishing `LLM_ERROR` the same way.
    pub fn on_llm_error(&self, run_id: &str, error: &str) -> Result<()> {
        Ok(self.adapter.on_llm_error(&self.bus, self.connection(), run_id, error)?)
    }

    // -- checkpoints ------------------------------------------------

    /// Snapshots the owner's workspace, chains it onto the owner's latest
    /// checkpoint commit (if any), then records a `checkpoint` node on
    /// `branch_id` whose `checkpoint_sha` is the new checkpoint's hash.
    pub fn create_checkpoint(
        &self,
        owner: &Owner,
        branch_id: BranchId,
        agent_memory: Value,
        conversation_history: Value,
        label: Option<String>,
    ) -> Result<Checkpoint> {
        let workspace = self.layout.workspace_for(owner)?;
        let entries = self.snapshots.snapshot_workspace(&workspace)?;
        let tree = self.snapshots.build_tree(&entries)?;

        let parent_commit = self.latest_checkpoint(owner)?.map(|cp| cp.filesystem_ref);
        let commit = self.snapshots.commit_tree(&tree, parent_commit.as_ref(), "checkpoint")?;

        let hash = Checkpoint::compute_hash(&agent_memory, &conversation_history);
        let size_bytes: u64 = entries.len() as u64;
        let checkpoint = Checkpoint {
            hash: hash.clone(),
            filesystem_ref: commit,
            agent_memory,
            conversation_history,
            files_changed: entries.keys().map(|p| p.display().to_string()).collect(),
            created_at: chrono::Utc::now(),
            compressed: false,
            size_bytes,
            label,
        };
        self.store.create_checkpoint(owner, &checkpoint)?;

        let branch = self
            .store
            .get_branch(branch_id)?
            .ok_or_else(|| Error::NotFound(format!("branch {branch_id}")))?;
        let mut node = NewNode::new(
            owner.clone(),
            branch_id,
            agentgit_types::ActionType::Checkpoint,
            agentgit_types::CallerType::System,
            Value::object(),
            Value::object(),
        );
        node.parent_id = branch.head_node_id;
        node.checkpoint_sha = Some(hash);
        let node_id = agentgit_store::dag::nodes::insert_node(self.connection(), &node)?;
        self.store.update_branch_head(branch_id, node_id)?;

        Ok(checkpoint)
    }

    /// Restores `checkpoint` into the owner's workspace.
    pub fn restore(&self, owner: &Owner, checkpoint: &Checkpoint) -> Result<()> {
        let workspace = self.layout.workspace_for(owner)?;
        self.snapshots.restore_commit(&checkpoint.filesystem_ref, &workspace)?;
        Ok(())
    }

    fn latest_checkpoint(&self, owner: &Owner) -> Result<Option<Checkpoint>> {
        let Some(node_id) = self.store.get_latest_checkpoint_node(owner)? else {
            return Ok(None);
        };
        let Some(node) = self.store.get_node(node_id)? else { return Ok(None) };
        let Some(hash) = node.checkpoint_sha else { return Ok(None) };
        Ok(self.store.get_checkpoint(&hash)?)
    }

    // -- recordings -----------------------------------------------------

    pub fn create_recording(&self, owner: &Owner, name: &str) -> Result<Recording> {
        Ok(self.recording.create_recording(self.connection(), owner, name)?)
    }

    pub fn complete_recording(
        &self,
        owner: &Owner,
        recording_id: &str,
        error: Option<&str>,
    ) -> Result<()> {
        Ok(self.recording.complete_recording(self.connection(), owner, recording_id, error)?)
    }

    pub fn set_baseline(&self, owner: &Owner, name: &str, recording_id: &str) -> Result<()> {
        Ok(self.recording.set_baseline(self.connection(), owner, name, recording_id)?)
    }

    pub fn list_baselines(&self, owner: &Owner) -> Result<Vec<Tag>> {
        Ok(self.store.list_tags(owner, Some(TagType::Baseline))?)
    }

    pub fn delete_baseline(&self, owner: &Owner, name: &str) -> Result<()> {
        Ok(self.store.delete_tag(owner, &format!("baseline/{name}"))?)
    }

    pub fn get_recording_details(
        &self,
        recording_id: &str,
    ) -> Result<Option<(Recording, Vec<LlmCallDetail>)>> {
        let Some(recording) = self.store.get_recording(recording_id)? else { return Ok(None) };
        let details = self.store.list_llm_call_details(recording_id)?;
        Ok(Some((recording, details)))
    }

    // -- comparisons ------------------------------------------------

    pub fn store_comparison(&self, result: &ComparisonResult) -> Result<i64> {
        Ok(self.store.store_comparison(result)?)
    }

    pub fn get_comparison(&self, comparison_id: i64) -> Result<Option<ComparisonResult>> {
        Ok(self.store.get_comparison(comparison_id)?)
    }

    pub fn list_comparisons(&self) -> Result<Vec<i64>> {
        Ok(self.store.list_comparisons()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_the_expected_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::open(tmp.path()).unwrap();
        assert!(session.layout.dag_sqlite().exists());
        assert!(session.layout.snapshots_git().join("HEAD").exists());
    }

    #[test]
    fn checkpoint_round_trip_restores_prior_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::open(tmp.path()).unwrap();
        let owner = Owner::new("alice", "s1");

        let branch_id =
            session.create_branch(&owner, "main", None, "explore", "tester").unwrap();

        let workspace = session.layout.workspace_for(&owner).unwrap();
        std::fs::write(workspace.join("x.txt"), "1").unwrap();

        let checkpoint_c = session
            .create_checkpoint(&owner, branch_id, Value::object(), Value::object(), None)
            .unwrap();

        std::fs::write(workspace.join("x.txt"), "2").unwrap();

        session.restore(&owner, &checkpoint_c).unwrap();
        let restored = std::fs::read_to_string(workspace.join("x.txt")).unwrap();
        assert_eq!(restored, "1");

        let nodes = session.get_branch_nodes(branch_id).unwrap();
        let checkpoint_nodes: Vec<_> = nodes
            .iter()
            .filter(|n| n.action_type == agentgit_types::ActionType::Checkpoint)
            .collect();
        assert_eq!(checkpoint_nodes.len(), 1);
        assert_eq!(checkpoint_nodes[0].checkpoint_sha.as_deref(), Some(checkpoint_c.hash.as_str()));
    }

    #[test]
    fn emit_user_input_creates_a_node_on_the_active_branch() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::open(tmp.path()).unwrap();
        let owner = Owner::new("bob", "s2");

        let branch_id =
            session.create_branch(&owner, "main", None, "explore", "tester").unwrap();
        session.emit_user_input(&owner, "hello", Value::object()).unwrap();

        let nodes = session.get_branch_nodes(branch_id).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].action_type, agentgit_types::ActionType::UserInput);
        assert_eq!(nodes[0].content.get("message").and_then(Value::as_str), Some("hello"));
    }

    #[test]
    fn recording_lifecycle_creates_baseline_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::open(tmp.path()).unwrap();
        let owner = Owner::new("carol", "s3");

        let recording = session.create_recording(&owner, "golden-path").unwrap();
        session.emit_user_input(&owner, "hi", Value::object()).unwrap();
        session.complete_recording(&owner, &recording.recording_id, None).unwrap();
        session.set_baseline(&owner, "golden-path", &recording.recording_id).unwrap();

        let baselines = session.list_baselines(&owner).unwrap();
        assert_eq!(baselines.len(), 1);
        assert_eq!(baselines[0].tag_name, "baseline/golden-path");
    }

    #[test]
    fn llm_call_creates_a_node_and_a_recording_sidecar() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::open(tmp.path()).unwrap();
        let owner = Owner::new("dana", "s4");

        let recording = session.create_recording(&owner, "take-1").unwrap();

        let mut message = Value::object();
        message.insert("role", Value::from("user"));
        message.insert("content", Value::from("hi"));
        let messages = Value::Array(vec![message]);
        let params = Value::object();

        let resolved = session.on_llm_start(
            "run-1",
            None,
            "ChatOpenAI",
            "gpt-4",
            &messages,
            &params,
            Some(&owner),
            None,
        );
        assert_eq!(resolved, owner);

        session.on_llm_end("run-1", &Value::object()).unwrap();

        let nodes = session.get_branch_nodes(recording.branch_id).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].action_type, agentgit_types::ActionType::LlmResponse);

        let (_, details) = session.get_recording_details(&recording.recording_id).unwrap().unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].provider, "openai");
    }
}
