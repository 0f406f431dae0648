use agentgit_types::{Branch, BranchId, BranchStatus, NewBranch, NodeId, Owner};
use rusqlite::{params, Connection, OptionalExtension};

use crate::Result;

use super::DagStore;

fn status_str(s: BranchStatus) -> &'static str {
    match s {
        BranchStatus::Active => "active",
        BranchStatus::Completed => "completed",
        BranchStatus::Abandoned => "abandoned",
        BranchStatus::Merged => "merged",
    }
}

fn status_from_str(s: &str) -> BranchStatus {
    match s {
        "completed" => BranchStatus::Completed,
        "abandoned" => BranchStatus::Abandoned,
        "merged" => BranchStatus::Merged,
        _ => BranchStatus::Active,
    }
}

fn row_to_branch(row: &rusqlite::Row) -> rusqlite::Result<Branch> {
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    Ok(Branch {
        id: row.get("branch_id")?,
        owner: Owner::new(row.get::<_, String>("user_id")?, row.get::<_, String>("session_id")?),
        name: row.get("name")?,
        head_node_id: row.get("head_node_id")?,
        base_node_id: row.get("base_node_id")?,
        status: status_from_str(&status),
        intent: row.get("intent")?,
        status_reason: row.get("status_reason")?,
        created_by: row.get("created_by")?,
        created_at: created_at.parse().unwrap_or_else(|_| chrono::Utc::now()),
        tokens_used: row.get::<_, i64>("tokens_used")? as u64,
        time_elapsed_seconds: row.get::<_, i64>("time_elapsed_seconds")? as u64,
    })
}

pub fn insert_branch(conn: &Connection, branch: &NewBranch) -> Result<BranchId> {
    conn.execute(
        r#"
        INSERT INTO branches (
            user_id, session_id, name, head_node_id, base_node_id, status,
            intent, status_reason, created_by, created_at, tokens_used, time_elapsed_seconds
        ) VALUES (?1, ?2, ?3, NULL, ?4, 'active', ?5, NULL, ?6, ?7, 0, 0)
        "#,
        params![
            branch.owner.user_id,
            branch.owner.session_id,
            branch.name,
            branch.base_node_id,
            branch.intent,
            branch.created_by,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_branch(conn: &Connection, id: BranchId) -> Result<Option<Branch>> {
    conn.query_row("SELECT * FROM branches WHERE branch_id = ?1", params![id], row_to_branch)
        .optional()
        .map_err(Into::into)
}

pub fn get_branch_by_name(conn: &Connection, owner: &Owner, name: &str) -> Result<Option<Branch>> {
    conn.query_row(
        "SELECT * FROM branches WHERE user_id = ?1 AND session_id = ?2 AND name = ?3",
        params![owner.user_id, owner.session_id, name],
        row_to_branch,
    )
    .optional()
    .map_err(Into::into)
}

/// Most recently created branch with status `active` for the owner.
pub fn get_active_branch(conn: &Connection, owner: &Owner) -> Result<Option<Branch>> {
    conn.query_row(
        r#"
        SELECT * FROM branches
        WHERE user_id = ?1 AND session_id = ?2 AND status = 'active'
        ORDER BY created_at DESC, branch_id DESC
        LIMIT 1
        "#,
        params![owner.user_id, owner.session_id],
        row_to_branch,
    )
    .optional()
    .map_err(Into::into)
}

pub fn list_branches(conn: &Connection, owner: &Owner) -> Result<Vec<Branch>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM branches WHERE user_id = ?1 AND session_id = ?2 ORDER BY branch_id ASC",
    )?;
    let rows = stmt.query_map(params![owner.user_id, owner.session_id], row_to_branch)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

pub fn update_branch_head(conn: &Connection, branch_id: BranchId, node_id: NodeId) -> Result<()> {
    conn.execute(
        "UPDATE branches SET head_node_id = ?1 WHERE branch_id = ?2",
        params![node_id, branch_id],
    )?;
    Ok(())
}

pub fn update_branch_status(
    conn: &Connection,
    branch_id: BranchId,
    status: BranchStatus,
    reason: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE branches SET status = ?1, status_reason = ?2 WHERE branch_id = ?3",
        params![status_str(status), reason, branch_id],
    )?;
    Ok(())
}

impl DagStore {
    pub fn create_branch(&self, branch: &NewBranch) -> Result<BranchId> {
        insert_branch(&self.conn, branch)
    }

    pub fn get_branch(&self, id: BranchId) -> Result<Option<Branch>> {
        get_branch(&self.conn, id)
    }

    pub fn get_branch_by_name(&self, owner: &Owner, name: &str) -> Result<Option<Branch>> {
        get_branch_by_name(&self.conn, owner, name)
    }

    pub fn get_active_branch(&self, owner: &Owner) -> Result<Option<Branch>> {
        get_active_branch(&self.conn, owner)
    }

    pub fn update_branch_head(&self, branch_id: BranchId, node_id: NodeId) -> Result<()> {
        update_branch_head(&self.conn, branch_id, node_id)
    }

    pub fn list_branches(&self, owner: &Owner) -> Result<Vec<Branch>> {
        list_branches(&self.conn, owner)
    }

    pub fn update_branch_status(
        &self,
        branch_id: BranchId,
        status: BranchStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        update_branch_status(&self.conn, branch_id, status, reason)
    }
}
