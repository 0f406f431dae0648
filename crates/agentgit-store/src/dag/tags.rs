use agentgit_types::{NodeId, Owner, Tag, TagType};
use rusqlite::{params, Connection, OptionalExtension};

use crate::Result;

use super::DagStore;

fn tag_type_str(t: TagType) -> &'static str {
    match t {
        TagType::Baseline => "baseline",
        TagType::Release => "release",
        TagType::Milestone => "milestone",
        TagType::Custom => "custom",
    }
}

fn tag_type_from_str(s: &str) -> TagType {
    match s {
        "release" => TagType::Release,
        "milestone" => TagType::Milestone,
        "custom" => TagType::Custom,
        _ => TagType::Baseline,
    }
}

fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    let tag_type: String = row.get("tag_type")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(Tag {
        owner: Owner::new(row.get::<_, String>("user_id")?, row.get::<_, String>("session_id")?),
        tag_name: row.get("tag_name")?,
        tag_type: tag_type_from_str(&tag_type),
        node_id: row.get("node_id")?,
        created_at: created_at.parse().unwrap_or_else(|_| chrono::Utc::now()),
        updated_at: updated_at.parse().unwrap_or_else(|_| chrono::Utc::now()),
    })
}

pub fn upsert_tag(
    conn: &Connection,
    owner: &Owner,
    tag_name: &str,
    tag_type: TagType,
    node_id: NodeId,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO at_tags (user_id, session_id, tag_name, tag_type, node_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        ON CONFLICT(user_id, session_id, tag_name) DO UPDATE SET
            tag_type = ?4, node_id = ?5, updated_at = ?6
        "#,
        params![owner.user_id, owner.session_id, tag_name, tag_type_str(tag_type), node_id, now],
    )?;
    Ok(())
}

pub fn get_tag(conn: &Connection, owner: &Owner, tag_name: &str) -> Result<Option<Tag>> {
    conn.query_row(
        "SELECT * FROM at_tags WHERE user_id = ?1 AND session_id = ?2 AND tag_name = ?3",
        params![owner.user_id, owner.session_id, tag_name],
        row_to_tag,
    )
    .optional()
    .map_err(Into::into)
}

pub fn list_tags(conn: &Connection, owner: &Owner, tag_type: Option<TagType>) -> Result<Vec<Tag>> {
    match tag_type {
        Some(t) => {
            let mut stmt = conn.prepare(
                "SELECT * FROM at_tags WHERE user_id = ?1 AND session_id = ?2 AND tag_type = ?3 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(
                params![owner.user_id, owner.session_id, tag_type_str(t)],
                row_to_tag,
            )?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT * FROM at_tags WHERE user_id = ?1 AND session_id = ?2 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![owner.user_id, owner.session_id], row_to_tag)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        }
    }
}

pub fn delete_tag(conn: &Connection, owner: &Owner, tag_name: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM at_tags WHERE user_id = ?1 AND session_id = ?2 AND tag_name = ?3",
        params![owner.user_id, owner.session_id, tag_name],
    )?;
    Ok(())
}

impl DagStore {
    pub fn upsert_tag(
        &self,
        owner: &Owner,
        tag_name: &str,
        tag_type: TagType,
        node_id: NodeId,
    ) -> Result<()> {
        upsert_tag(&self.conn, owner, tag_name, tag_type, node_id)
    }

    pub fn get_tag(&self, owner: &Owner, tag_name: &str) -> Result<Option<Tag>> {
        get_tag(&self.conn, owner, tag_name)
    }

    pub fn list_tags(&self, owner: &Owner, tag_type: Option<TagType>) -> Result<Vec<Tag>> {
        list_tags(&self.conn, owner, tag_type)
    }

    pub fn delete_tag(&self, owner: &Owner, tag_name: &str) -> Result<()> {
        delete_tag(&self.conn, owner, tag_name)
    }
}
