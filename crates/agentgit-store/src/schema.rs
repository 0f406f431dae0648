use rusqlite::Connection;

use crate::Result;

// Schema version (increment when changing table definitions).
pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version != 0 && current_version != SCHEMA_VERSION {
        drop_all_tables(conn)?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            parent_id INTEGER,
            branch_id INTEGER NOT NULL,
            checkpoint_sha TEXT,
            action_type TEXT NOT NULL,
            content TEXT NOT NULL,
            triggered_by TEXT NOT NULL,
            caller_context TEXT NOT NULL,
            state_hash TEXT,
            timestamp TEXT NOT NULL,
            duration_ms INTEGER,
            token_count INTEGER,
            FOREIGN KEY (parent_id) REFERENCES nodes(id)
        );

        CREATE TABLE IF NOT EXISTS branches (
            branch_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            name TEXT NOT NULL,
            head_node_id INTEGER,
            base_node_id INTEGER,
            status TEXT NOT NULL,
            intent TEXT NOT NULL,
            status_reason TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            tokens_used INTEGER NOT NULL DEFAULT 0,
            time_elapsed_seconds INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, session_id, name)
        );

        CREATE TABLE IF NOT EXISTS checkpoints (
            hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            filesystem_ref TEXT NOT NULL,
            agent_memory TEXT NOT NULL,
            conversation_history TEXT NOT NULL,
            files_changed TEXT NOT NULL,
            created_at TEXT NOT NULL,
            compressed INTEGER NOT NULL,
            size_bytes INTEGER NOT NULL,
            label TEXT
        );

        CREATE TABLE IF NOT EXISTS at_tags (
            user_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            tag_name TEXT NOT NULL,
            tag_type TEXT NOT NULL,
            node_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, session_id, tag_name)
        );

        CREATE TABLE IF NOT EXISTS at_recordings (
            recording_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            name TEXT NOT NULL,
            branch_id INTEGER NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            completed_at TEXT,
            step_count INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            config_snapshot TEXT NOT NULL,
            metadata TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS at_llm_call_details (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            node_id INTEGER NOT NULL UNIQUE,
            recording_id TEXT NOT NULL,
            step_index INTEGER NOT NULL,
            provider TEXT NOT NULL,
            method TEXT NOT NULL,
            model TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            request_params TEXT NOT NULL,
            response_data TEXT NOT NULL,
            is_streaming INTEGER NOT NULL,
            stream_id TEXT,
            duration_ms INTEGER,
            token_usage TEXT,
            error TEXT,
            metadata TEXT NOT NULL,
            FOREIGN KEY (recording_id) REFERENCES at_recordings(recording_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS at_comparisons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            baseline_recording_id TEXT NOT NULL,
            replay_recording_id TEXT NOT NULL,
            total INTEGER NOT NULL,
            matched INTEGER NOT NULL,
            diverged INTEGER NOT NULL,
            added INTEGER NOT NULL,
            removed INTEGER NOT NULL,
            cascaded INTEGER NOT NULL,
            root_cause_index INTEGER,
            overall_pass INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS at_step_comparisons (
            comparison_id INTEGER NOT NULL,
            step_index INTEGER NOT NULL,
            baseline_index INTEGER,
            replay_index INTEGER,
            status TEXT NOT NULL,
            match_type TEXT,
            similarity_score REAL NOT NULL,
            diff_summary TEXT,
            root_cause_index INTEGER,
            PRIMARY KEY (comparison_id, step_index),
            FOREIGN KEY (comparison_id) REFERENCES at_comparisons(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_nodes_owner ON nodes(user_id, session_id);
        CREATE INDEX IF NOT EXISTS idx_branches_owner ON branches(user_id, session_id);
        CREATE INDEX IF NOT EXISTS idx_checkpoints_owner ON checkpoints(user_id, session_id);
        CREATE INDEX IF NOT EXISTS idx_recordings_owner ON at_recordings(user_id, session_id);
        "#,
    )?;

    conn.execute(&format!("PRAGMA user_version = {SCHEMA_VERSION}"), [])?;

    Ok(())
}

fn drop_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS at_step_comparisons;
        DROP TABLE IF EXISTS at_comparisons;
        DROP TABLE IF EXISTS at_llm_call_details;
        DROP TABLE IF EXISTS at_recordings;
        DROP TABLE IF EXISTS at_tags;
        DROP TABLE IF EXISTS checkpoints;
        DROP TABLE IF EXISTS branches;
        DROP TABLE IF EXISTS nodes;
        "#,
    )?;
    Ok(())
}
