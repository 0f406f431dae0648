use std::collections::HashMap;
use std::sync::Mutex;

use agentgit_bus::{Connection, Subscriber};
use agentgit_store::dag::{branches, recordings, tags};
use agentgit_types::{
    CallerType, Event, EventKind, LlmCallDetail, NewBranch, Owner, Recording, RecordingStatus,
    TagType, Value,
};

use crate::error::{Error, Result};

fn owner_key(owner: &Owner) -> (String, String) {
    (owner.user_id.clone(), owner.session_id.clone())
}

/// Owns the notion of an "active recording" per owner and, while one is
/// active, attaches an `LlmCallDetail` sidecar to every `LLM_CALL_END`
/// node the tracer just appended. Must be registered on the bus *after*
/// the tracer so the branch head it reads is the node the tracer created
/// for this same event.
pub struct RecordingSession {
    active: Mutex<HashMap<(String, String), String>>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession {
    pub fn new() -> Self {
        Self { active: Mutex::new(HashMap::new()) }
    }

    /// Creates a fresh `recording/<name>` branch, a `Recording` row in
    /// `in_progress` status, and marks it active for `owner`.
    pub fn create_recording(
        &self,
        conn: &rusqlite::Connection,
        owner: &Owner,
        name: &str,
    ) -> Result<Recording> {
        let branch_id = branches::insert_branch(
            conn,
            &NewBranch {
                owner: owner.clone(),
                name: format!("recording/{name}"),
                base_node_id: None,
                intent: format!("record-replay recording {name}"),
                created_by: "recording_session".to_string(),
            },
        )?;

        let recording = Recording {
            recording_id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            owner: owner.clone(),
            branch_id,
            status: RecordingStatus::InProgress,
            created_at: chrono::Utc::now(),
            completed_at: None,
            step_count: 0,
            error: None,
            config_snapshot: Value::object(),
            metadata: Value::object(),
        };
        recordings::insert_recording(conn, &recording)?;

        self.active.lock().unwrap().insert(owner_key(owner), recording.recording_id.clone());
        Ok(recording)
    }

    /// Marks `recording_id` completed (or failed, if `error` is set) and
    /// clears it as the active recording for `owner`.
    pub fn complete_recording(
        &self,
        conn: &rusqlite::Connection,
        owner: &Owner,
        recording_id: &str,
        error: Option<&str>,
    ) -> Result<()> {
        let status = if error.is_some() { RecordingStatus::Failed } else { RecordingStatus::Completed };
        recordings::complete_recording(conn, recording_id, status, error)?;

        let mut active = self.active.lock().unwrap();
        if active.get(&owner_key(owner)).map(String::as_str) == Some(recording_id) {
            active.remove(&owner_key(owner));
        }
        Ok(())
    }

    /// Tags `baseline/<name>` at the recording's branch head.
    pub fn set_baseline(
        &self,
        conn: &rusqlite::Connection,
        owner: &Owner,
        name: &str,
        recording_id: &str,
    ) -> Result<()> {
        let recording =
            recordings::get_recording(conn, recording_id)?.ok_or_else(|| Error::UnknownRunId(recording_id.to_string()))?;
        let branch = branches::get_branch(conn, recording.branch_id)?
            .ok_or_else(|| Error::UnknownRunId(recording_id.to_string()))?;
        let head = branch.head_node_id.ok_or(Error::NoActiveRecording)?;

        tags::upsert_tag(conn, owner, &format!("baseline/{name}"), TagType::Baseline, head)?;
        Ok(())
    }

    fn active_recording_id(&self, owner: &Owner) -> Option<String> {
        self.active.lock().unwrap().get(&owner_key(owner)).cloned()
    }
}

impl Subscriber for RecordingSession {
    fn handle(&self, event: &Event, conn: Option<&Connection>) -> agentgit_bus::Result<()> {
        if event.kind != EventKind::LlmCallEnd {
            return Ok(());
        }
        let Some(conn) = conn else { return Ok(()) };

        let Some(recording_id) = self.active_recording_id(&event.owner) else {
            return Ok(());
        };

        let branch = branches::get_active_branch(conn, &event.owner)
            .map_err(agentgit_bus::subscriber_error)?;
        let Some(node_id) = branch.and_then(|b| b.head_node_id) else {
            return Ok(());
        };

        let step_index = recordings::increment_step_count(conn, &recording_id)
            .map_err(agentgit_bus::subscriber_error)?
            .saturating_sub(1);

        let metadata = &event.metadata;
        let detail = LlmCallDetail {
            id: 0,
            node_id,
            recording_id,
            step_index,
            provider: field_str(metadata, "provider"),
            method: field_str(metadata, "method"),
            model: field_str(metadata, "model"),
            fingerprint: field_str(metadata, "fingerprint"),
            request_params: metadata.get("request_params").cloned().unwrap_or_else(Value::object),
            response_data: metadata.get("response_data").cloned().unwrap_or_else(Value::object),
            is_streaming: matches!(metadata.get("is_streaming"), Some(Value::Bool(true))),
            stream_id: metadata.get("stream_id").and_then(Value::as_str).map(str::to_string),
            duration_ms: None,
            token_usage: metadata.get("token_usage").cloned(),
            error: None,
            metadata: Value::object(),
        };

        recordings::insert_llm_call_detail(conn, &detail).map_err(agentgit_bus::subscriber_error)
    }
}

fn field_str(metadata: &Value, key: &str) -> String {
    metadata.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgit_types::{ActionType, NewNode};
    use rusqlite::Connection as SqliteConnection;

    fn open_conn() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        agentgit_store::test_support::init_schema_for_tests(&conn).unwrap();
        conn
    }

    #[test]
    fn no_op_without_an_active_recording() {
        let conn = open_conn();
        let session = RecordingSession::new();
        let owner = Owner::new("u", "s");
        let event = Event::new(EventKind::LlmCallEnd, owner);
        session.handle(&event, Some(&conn)).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM at_llm_call_details", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn attaches_sidecar_to_the_node_the_tracer_just_created() {
        let conn = open_conn();
        let owner = Owner::new("u", "s");
        let session = RecordingSession::new();
        let recording = session.create_recording(&conn, &owner, "my-test").unwrap();

        // Simulate the tracer having just appended a node on the recording
        // branch and advanced its head.
        let mut node = NewNode::new(
            owner.clone(),
            recording.branch_id,
            ActionType::LlmResponse,
            CallerType::AgentTool,
            Value::object(),
            Value::object(),
        );
        node.parent_id = None;
        let node_id = agentgit_store::dag::nodes::insert_node(&conn, &node).unwrap();
        branches::update_branch_head(&conn, recording.branch_id, node_id).unwrap();

        let mut metadata = Value::object();
        metadata.insert("provider", Value::from("openai"));
        metadata.insert("fingerprint", Value::from("abc123"));
        let event = Event::new(EventKind::LlmCallEnd, owner).with_metadata(metadata);
        session.handle(&event, Some(&conn)).unwrap();

        let details = recordings::list_llm_call_details(&conn, &recording.recording_id).unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].node_id, node_id);
        assert_eq!(details[0].step_index, 0);
        assert_eq!(details[0].provider, "openai");
    }
}
