use std::sync::atomic::{AtomicU64, Ordering};

use agentgit_bus::{Connection, Subscriber};
use agentgit_store::dag::nodes;
use agentgit_types::{ActionType, CallerType, Event, EventKind, NewNode, Value};

/// Converts bus events into DAG nodes, entirely driven by the database's
/// view of the active branch for the owner. Holds no per-session mutable
/// cursor — stateless across sessions, safe to share across concurrent
/// owners — except for one process-wide turn counter, advisory only when
/// multiple sessions are concurrently active (see `caller_context.turn`).
pub struct Tracer {
    turn: AtomicU64,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer {
    pub fn new() -> Self {
        Self { turn: AtomicU64::new(0) }
    }

    fn action_for(kind: EventKind) -> Option<(ActionType, CallerType)> {
        match kind {
            EventKind::UserInput => Some((ActionType::UserInput, CallerType::HumanUi)),
            EventKind::LlmCallStart => Some((ActionType::LlmCall, CallerType::AgentTool)),
            EventKind::LlmCallEnd => Some((ActionType::LlmResponse, CallerType::AgentTool)),
            // Nodes are recorded only for stream ends.
            EventKind::LlmStreamChunk => None,
            EventKind::LlmStreamEnd => Some((ActionType::LlmResponse, CallerType::AgentTool)),
            EventKind::LlmError => Some((ActionType::LlmError, CallerType::System)),
            EventKind::ToolCallStart => Some((ActionType::ToolCall, CallerType::AgentTool)),
            EventKind::ToolCallEnd => Some((ActionType::ToolResult, CallerType::AgentTool)),
            EventKind::ToolError => Some((ActionType::ToolError, CallerType::System)),
            // Turn-start only bumps the counter; it carries no action kind
            // of its own in the closed set.
            EventKind::AgentTurnStart => None,
            EventKind::AgentTurnEnd => Some((ActionType::AgentTurnEnd, CallerType::System)),
            // Informational only; not part of the closed action-kind set.
            EventKind::AgentThinking => None,
        }
    }

    fn create_node(&self, conn: &Connection, event: &Event, action_type: ActionType, triggered_by: CallerType) -> agentgit_bus::Result<()> {
        let Some(branch) = agentgit_store::dag::branches::get_active_branch(conn, &event.owner)
            .map_err(agentgit_bus::subscriber_error)?
        else {
            return Ok(());
        };

        let mut caller_context = Value::object();
        caller_context.insert("turn", Value::Number(self.turn.load(Ordering::SeqCst).into()));

        let mut new_node = NewNode::new(
            event.owner.clone(),
            branch.id,
            action_type,
            triggered_by,
            event.metadata.clone(),
            caller_context,
        );
        new_node.parent_id = branch.head_node_id;

        let node_id = nodes::insert_node(conn, &new_node).map_err(agentgit_bus::subscriber_error)?;

        agentgit_store::dag::branches::update_branch_head(conn, branch.id, node_id)
            .map_err(agentgit_bus::subscriber_error)
    }
}

impl Subscriber for Tracer {
    fn handle(&self, event: &Event, conn: Option<&Connection>) -> agentgit_bus::Result<()> {
        if event.kind == EventKind::AgentTurnStart {
            self.turn.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }

        let Some((action_type, triggered_by)) = Self::action_for(event.kind) else {
            return Ok(());
        };

        let Some(conn) = conn else {
            return Ok(());
        };

        self.create_node(conn, event, action_type, triggered_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgit_store::dag::{branches, nodes as node_store};
    use agentgit_types::{NewBranch, Owner};
    use rusqlite::Connection as SqliteConnection;

    fn open_conn() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        agentgit_store::test_support::init_schema_for_tests(&conn).unwrap();
        conn
    }

    #[test]
    fn drops_event_when_no_active_branch() {
        let conn = open_conn();
        let tracer = Tracer::new();
        let event = Event::new(EventKind::UserInput, Owner::new("u", "s"));
        tracer.handle(&event, Some(&conn)).unwrap();
        // No branch, no node.
    }

    #[test]
    fn appends_node_and_advances_branch_head() {
        let conn = open_conn();
        let owner = Owner::new("u", "s");
        let branch_id = branches::insert_branch(
            &conn,
            &NewBranch {
                owner: owner.clone(),
                name: "main".into(),
                base_node_id: None,
                intent: "explore".into(),
                created_by: "tester".into(),
            },
        )
        .unwrap();

        let tracer = Tracer::new();
        let event = Event::new(EventKind::UserInput, owner.clone())
            .with_metadata(Value::from("hello"));
        tracer.handle(&event, Some(&conn)).unwrap();

        let branch = branches::get_branch(&conn, branch_id).unwrap().unwrap();
        assert!(branch.head_node_id.is_some());

        let node = node_store::get_node(&conn, branch.head_node_id.unwrap()).unwrap().unwrap();
        assert_eq!(node.action_type, ActionType::UserInput);
        assert_eq!(node.parent_id, None);

        let event2 = Event::new(EventKind::ToolCallStart, owner).with_metadata(Value::object());
        tracer.handle(&event2, Some(&conn)).unwrap();
        let branch = branches::get_branch(&conn, branch_id).unwrap().unwrap();
        let node2 = node_store::get_node(&conn, branch.head_node_id.unwrap()).unwrap().unwrap();
        assert_eq!(node2.parent_id, Some(node.id));
    }

    #[test]
    fn stream_chunk_and_turn_start_never_create_nodes() {
        let conn = open_conn();
        let owner = Owner::new("u", "s");
        branches::insert_branch(
            &conn,
            &NewBranch {
                owner: owner.clone(),
                name: "main".into(),
                base_node_id: None,
                intent: "explore".into(),
                created_by: "tester".into(),
            },
        )
        .unwrap();

        let tracer = Tracer::new();
        tracer.handle(&Event::new(EventKind::LlmStreamChunk, owner.clone()), Some(&conn)).unwrap();
        tracer.handle(&Event::new(EventKind::AgentTurnStart, owner.clone()), Some(&conn)).unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 0);
        assert_eq!(tracer.turn.load(Ordering::SeqCst), 1);
    }
}
