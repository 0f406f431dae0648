use agentgit_types::{LlmCallDetail, Owner, Recording, RecordingStatus};
use rusqlite::{params, Connection, OptionalExtension};

use crate::json::value_from_sql;
use crate::json::value_to_sql;
use crate::Result;

use super::DagStore;

fn status_str(s: RecordingStatus) -> &'static str {
    match s {
        RecordingStatus::InProgress => "in_progress",
        RecordingStatus::Completed => "completed",
        RecordingStatus::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> RecordingStatus {
    match s {
        "completed" => RecordingStatus::Completed,
        "failed" => RecordingStatus::Failed,
        _ => RecordingStatus::InProgress,
    }
}

fn row_to_recording(row: &rusqlite::Row) -> rusqlite::Result<Recording> {
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let completed_at: Option<String> = row.get("completed_at")?;
    let config_snapshot: String = row.get("config_snapshot")?;
    let metadata: String = row.get("metadata")?;
    Ok(Recording {
        recording_id: row.get("recording_id")?,
        name: row.get("name")?,
        owner: Owner::new(row.get::<_, String>("user_id")?, row.get::<_, String>("session_id")?),
        branch_id: row.get("branch_id")?,
        status: status_from_str(&status),
        created_at: created_at.parse().unwrap_or_else(|_| chrono::Utc::now()),
        completed_at: completed_at.and_then(|s| s.parse().ok()),
        step_count: row.get::<_, i64>("step_count")? as u32,
        error: row.get("error")?,
        config_snapshot: value_from_sql(&config_snapshot),
        metadata: value_from_sql(&metadata),
    })
}

pub fn insert_recording(conn: &Connection, recording: &Recording) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO at_recordings (
            recording_id, user_id, session_id, name, branch_id, status,
            created_at, completed_at, step_count, error, config_snapshot, metadata
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            recording.recording_id,
            recording.owner.user_id,
            recording.owner.session_id,
            recording.name,
            recording.branch_id,
            status_str(recording.status),
            recording.created_at.to_rfc3339(),
            recording.completed_at.map(|t| t.to_rfc3339()),
            recording.step_count,
            recording.error,
            value_to_sql(&recording.config_snapshot),
            value_to_sql(&recording.metadata),
        ],
    )?;
    Ok(())
}

pub fn get_recording(conn: &Connection, recording_id: &str) -> Result<Option<Recording>> {
    conn.query_row(
        "SELECT * FROM at_recordings WHERE recording_id = ?1",
        params![recording_id],
        row_to_recording,
    )
    .optional()
    .map_err(Into::into)
}

pub fn complete_recording(
    conn: &Connection,
    recording_id: &str,
    status: RecordingStatus,
    error: Option<&str>,
) -> Result<()> {
    conn.execute(
        r#"
        UPDATE at_recordings SET status = ?1, error = ?2, completed_at = ?3
        WHERE recording_id = ?4
        "#,
        params![status_str(status), error, chrono::Utc::now().to_rfc3339(), recording_id],
    )?;
    Ok(())
}

pub fn increment_step_count(conn: &Connection, recording_id: &str) -> Result<u32> {
    conn.execute(
        "UPDATE at_recordings SET step_count = step_count + 1 WHERE recording_id = ?1",
        params![recording_id],
    )?;
    conn.query_row(
        "SELECT step_count FROM at_recordings WHERE recording_id = ?1",
        params![recording_id],
        |row| row.get::<_, i64>(0),
    )
    .map(|v| v as u32)
    .map_err(Into::into)
}

pub fn delete_recording(conn: &Connection, recording_id: &str) -> Result<()> {
    conn.execute("DELETE FROM at_recordings WHERE recording_id = ?1", params![recording_id])?;
    Ok(())
}

fn row_to_detail(row: &rusqlite::Row) -> rusqlite::Result<LlmCallDetail> {
    let request_params: String = row.get("request_params")?;
    let response_data: String = row.get("response_data")?;
    let token_usage: Option<String> = row.get("token_usage")?;
    let metadata: String = row.get("metadata")?;
    Ok(LlmCallDetail {
        id: row.get("id")?,
        node_id: row.get("node_id")?,
        recording_id: row.get("recording_id")?,
        step_index: row.get::<_, i64>("step_index")? as u32,
        provider: row.get("provider")?,
        method: row.get("method")?,
        model: row.get("model")?,
        fingerprint: row.get("fingerprint")?,
        request_params: value_from_sql(&request_params),
        response_data: value_from_sql(&response_data),
        is_streaming: row.get::<_, i64>("is_streaming")? != 0,
        stream_id: row.get("stream_id")?,
        duration_ms: row.get::<_, Option<i64>>("duration_ms")?.map(|v| v as u64),
        token_usage: token_usage.map(|s| value_from_sql(&s)),
        error: row.get("error")?,
        metadata: value_from_sql(&metadata),
    })
}

pub fn insert_llm_call_detail(conn: &Connection, detail: &LlmCallDetail) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO at_llm_call_details (
            node_id, recording_id, step_index, provider, method, model,
            fingerprint, request_params, response_data, is_streaming,
            stream_id, duration_ms, token_usage, error, metadata
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
        params![
            detail.node_id,
            detail.recording_id,
            detail.step_index,
            detail.provider,
            detail.method,
            detail.model,
            detail.fingerprint,
            value_to_sql(&detail.request_params),
            value_to_sql(&detail.response_data),
            detail.is_streaming as i64,
            detail.stream_id,
            detail.duration_ms.map(|v| v as i64),
            detail.token_usage.as_ref().map(value_to_sql),
            detail.error,
            value_to_sql(&detail.metadata),
        ],
    )?;
    Ok(())
}

pub fn list_llm_call_details(conn: &Connection, recording_id: &str) -> Result<Vec<LlmCallDetail>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM at_llm_call_details WHERE recording_id = ?1 ORDER BY step_index ASC",
    )?;
    let rows = stmt.query_map(params![recording_id], row_to_detail)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

impl DagStore {
    pub fn create_recording(&self, recording: &Recording) -> Result<()> {
        insert_recording(&self.conn, recording)
    }

    pub fn get_recording(&self, recording_id: &str) -> Result<Option<Recording>> {
        get_recording(&self.conn, recording_id)
    }

    pub fn complete_recording(
        &self,
        recording_id: &str,
        status: RecordingStatus,
        error: Option<&str>,
    ) -> Result<()> {
        complete_recording(&self.conn, recording_id, status, error)
    }

    pub fn delete_recording(&self, recording_id: &str) -> Result<()> {
        delete_recording(&self.conn, recording_id)
    }

    pub fn list_llm_call_details(&self, recording_id: &str) -> Result<Vec<LlmCallDetail>> {
        list_llm_call_details(&self.conn, recording_id)
    }
}
