use agentgit_types::{Checkpoint, NodeId, Owner};
use rusqlite::{params, Connection, OptionalExtension};

use crate::json::{string_vec_from_sql, string_vec_to_sql, value_from_sql, value_to_sql};
use crate::Result;

use super::DagStore;

fn row_to_checkpoint(row: &rusqlite::Row) -> rusqlite::Result<Checkpoint> {
    let agent_memory: String = row.get("agent_memory")?;
    let conversation_history: String = row.get("conversation_history")?;
    let files_changed: String = row.get("files_changed")?;
    let created_at: String = row.get("created_at")?;
    Ok(Checkpoint {
        hash: row.get("hash")?,
        filesystem_ref: row.get("filesystem_ref")?,
        agent_memory: value_from_sql(&agent_memory),
        conversation_history: value_from_sql(&conversation_history),
        files_changed: string_vec_from_sql(&files_changed),
        created_at: created_at.parse().unwrap_or_else(|_| chrono::Utc::now()),
        compressed: row.get::<_, i64>("compressed")? != 0,
        size_bytes: row.get::<_, i64>("size_bytes")? as u64,
        label: row.get("label")?,
    })
}

pub fn insert_checkpoint(conn: &Connection, owner: &Owner, checkpoint: &Checkpoint) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO checkpoints (
            hash, user_id, session_id, filesystem_ref, agent_memory,
            conversation_history, files_changed, created_at, compressed, size_bytes, label
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            checkpoint.hash,
            owner.user_id,
            owner.session_id,
            checkpoint.filesystem_ref,
            value_to_sql(&checkpoint.agent_memory),
            value_to_sql(&checkpoint.conversation_history),
            string_vec_to_sql(&checkpoint.files_changed),
            checkpoint.created_at.to_rfc3339(),
            checkpoint.compressed as i64,
            checkpoint.size_bytes as i64,
            checkpoint.label,
        ],
    )?;
    Ok(())
}

pub fn get_checkpoint(conn: &Connection, hash: &str) -> Result<Option<Checkpoint>> {
    conn.query_row("SELECT * FROM checkpoints WHERE hash = ?1", params![hash], row_to_checkpoint)
        .optional()
        .map_err(Into::into)
}

/// Most recent node with a non-null `checkpoint_sha`, for parent chaining.
pub fn get_latest_checkpoint_node(conn: &Connection, owner: &Owner) -> Result<Option<NodeId>> {
    conn.query_row(
        r#"
        SELECT id FROM nodes
        WHERE user_id = ?1 AND session_id = ?2 AND checkpoint_sha IS NOT NULL
        ORDER BY id DESC
        LIMIT 1
        "#,
        params![owner.user_id, owner.session_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}

impl DagStore {
    pub fn create_checkpoint(&self, owner: &Owner, checkpoint: &Checkpoint) -> Result<()> {
        insert_checkpoint(&self.conn, owner, checkpoint)
    }

    pub fn get_checkpoint(&self, hash: &str) -> Result<Option<Checkpoint>> {
        get_checkpoint(&self.conn, hash)
    }

    pub fn get_latest_checkpoint_node(&self, owner: &Owner) -> Result<Option<NodeId>> {
        get_latest_checkpoint_node(&self.conn, owner)
    }
}
