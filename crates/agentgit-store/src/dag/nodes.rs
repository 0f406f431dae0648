use agentgit_types::{ActionType, CallerType, ExecutionNode, NewNode, NodeId, Owner};
use rusqlite::{params, Connection, OptionalExtension};

use crate::json::{value_from_sql, value_to_sql};
use crate::Result;

use super::DagStore;

fn action_type_str(a: ActionType) -> &'static str {
    match a {
        ActionType::UserInput => "user_input",
        ActionType::LlmCall => "llm_call",
        ActionType::LlmResponse => "llm_response",
        ActionType::LlmError => "llm_error",
        ActionType::ToolCall => "tool_call",
        ActionType::ToolResult => "tool_result",
        ActionType::ToolError => "tool_error",
        ActionType::Checkpoint => "checkpoint",
        ActionType::BranchCreate => "branch_create",
        ActionType::BranchSwitch => "branch_switch",
        ActionType::Backtrack => "backtrack",
        ActionType::AgentTurnEnd => "agent_turn_end",
    }
}

fn action_type_from_str(s: &str) -> ActionType {
    match s {
        "user_input" => ActionType::UserInput,
        "llm_call" => ActionType::LlmCall,
        "llm_response" => ActionType::LlmResponse,
        "llm_error" => ActionType::LlmError,
        "tool_call" => ActionType::ToolCall,
        "tool_result" => ActionType::ToolResult,
        "tool_error" => ActionType::ToolError,
        "checkpoint" => ActionType::Checkpoint,
        "branch_create" => ActionType::BranchCreate,
        "branch_switch" => ActionType::BranchSwitch,
        "backtrack" => ActionType::Backtrack,
        _ => ActionType::AgentTurnEnd,
    }
}

fn caller_type_str(c: CallerType) -> &'static str {
    match c {
        CallerType::HumanCli => "human_cli",
        CallerType::HumanUi => "human_ui",
        CallerType::AgentTool => "agent_tool",
        CallerType::System => "system",
    }
}

fn caller_type_from_str(s: &str) -> CallerType {
    match s {
        "human_cli" => CallerType::HumanCli,
        "human_ui" => CallerType::HumanUi,
        "agent_tool" => CallerType::AgentTool,
        _ => CallerType::System,
    }
}

fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<ExecutionNode> {
    let content: String = row.get("content")?;
    let caller_context: String = row.get("caller_context")?;
    let action_type: String = row.get("action_type")?;
    let triggered_by: String = row.get("triggered_by")?;
    let timestamp: String = row.get("timestamp")?;

    Ok(ExecutionNode {
        id: row.get("id")?,
        owner: Owner::new(row.get::<_, String>("user_id")?, row.get::<_, String>("session_id")?),
        parent_id: row.get("parent_id")?,
        branch_id: row.get("branch_id")?,
        checkpoint_sha: row.get("checkpoint_sha")?,
        action_type: action_type_from_str(&action_type),
        content: value_from_sql(&content),
        triggered_by: caller_type_from_str(&triggered_by),
        caller_context: value_from_sql(&caller_context),
        state_hash: row.get("state_hash")?,
        timestamp: timestamp.parse().unwrap_or_else(|_| chrono::Utc::now()),
        duration_ms: row.get::<_, Option<i64>>("duration_ms")?.map(|v| v as u64),
        token_count: row.get::<_, Option<i64>>("token_count")?.map(|v| v as u64),
    })
}

/// Insert a node and return its assigned id.
pub fn insert_node(conn: &Connection, node: &NewNode) -> Result<NodeId> {
    conn.execute(
        r#"
        INSERT INTO nodes (
            user_id, session_id, parent_id, branch_id, checkpoint_sha,
            action_type, content, triggered_by, caller_context, state_hash,
            timestamp, duration_ms, token_count
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            node.owner.user_id,
            node.owner.session_id,
            node.parent_id,
            node.branch_id,
            node.checkpoint_sha,
            action_type_str(node.action_type),
            value_to_sql(&node.content),
            caller_type_str(node.triggered_by),
            value_to_sql(&node.caller_context),
            node.state_hash,
            chrono::Utc::now().to_rfc3339(),
            node.duration_ms.map(|v| v as i64),
            node.token_count.map(|v| v as i64),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_node(conn: &Connection, id: NodeId) -> Result<Option<ExecutionNode>> {
    conn.query_row("SELECT * FROM nodes WHERE id = ?1", params![id], row_to_node)
        .optional()
        .map_err(Into::into)
}

/// Walk `parent_id` links from `node_id`, returning nodes root-first.
/// Terminates on a null parent or a broken link (defensive).
pub fn get_path_to_root(conn: &Connection, node_id: NodeId) -> Result<Vec<ExecutionNode>> {
    let mut path = Vec::new();
    let mut current = Some(node_id);
    while let Some(id) = current {
        match get_node(conn, id)? {
            Some(node) => {
                current = node.parent_id;
                path.push(node);
            }
            None => break,
        }
    }
    path.reverse();
    Ok(path)
}

pub fn get_nodes_for_branch(conn: &Connection, branch_id: i64) -> Result<Vec<ExecutionNode>> {
    let mut stmt = conn.prepare("SELECT * FROM nodes WHERE branch_id = ?1 ORDER BY id ASC")?;
    let rows = stmt.query_map(params![branch_id], row_to_node)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

impl DagStore {
    pub fn get_node(&self, id: NodeId) -> Result<Option<ExecutionNode>> {
        get_node(&self.conn, id)
    }

    pub fn get_path_to_root(&self, node_id: NodeId) -> Result<Vec<ExecutionNode>> {
        get_path_to_root(&self.conn, node_id)
    }

    pub fn get_branch_nodes(&self, branch_id: i64) -> Result<Vec<ExecutionNode>> {
        get_nodes_for_branch(&self.conn, branch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgit_types::Value;

    #[test]
    fn path_to_root_is_root_first_and_stops_on_broken_link() {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::init_schema(&conn).unwrap();

        let owner = Owner::new("u", "s");
        let n1 = insert_node(
            &conn,
            &NewNode::new(
                owner.clone(),
                1,
                ActionType::UserInput,
                CallerType::HumanCli,
                Value::from("hi"),
                Value::object(),
            ),
        )
        .unwrap();

        let mut n2 = NewNode::new(
            owner.clone(),
            1,
            ActionType::LlmResponse,
            CallerType::System,
            Value::from("hi back"),
            Value::object(),
        );
        n2.parent_id = Some(n1);
        let n2_id = insert_node(&conn, &n2).unwrap();

        let path = get_path_to_root(&conn, n2_id).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].id, n1);
        assert_eq!(path[1].id, n2_id);

        // broken link: parent id that doesn't exist
        let mut n3 = NewNode::new(
            owner,
            1,
            ActionType::LlmResponse,
            CallerType::System,
            Value::from("orphan"),
            Value::object(),
        );
        n3.parent_id = Some(99999);
        let n3_id = insert_node(&conn, &n3).unwrap();
        let path = get_path_to_root(&conn, n3_id).unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].id, n3_id);
    }
}
