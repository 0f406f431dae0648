use std::sync::Arc;

use agentgit_bus::{subscriber_error, Connection, EventBus, Subscriber};
use agentgit_engine::{RecordingSession, Tracer};
use agentgit_store::dag::branches;
use agentgit_types::{Event, EventKind, NewBranch, Owner};
use rusqlite::Connection as SqliteConnection;

struct AlwaysFails;

impl Subscriber for AlwaysFails {
    fn handle(&self, _event: &Event, _conn: Option<&Connection>) -> agentgit_bus::Result<()> {
        Err(subscriber_error(std::io::Error::other("boom")))
    }
}

/// A subscriber registered after the tracer that always fails must roll
/// back the tracer's own write for the same event: no node, no advanced
/// branch head, no recording sidecar survive.
#[test]
fn failing_subscriber_rolls_back_the_tracer_and_recording_session_too() {
    let conn = SqliteConnection::open_in_memory().unwrap();
    agentgit_store::test_support::init_schema_for_tests(&conn).unwrap();

    let owner = Owner::new("alice", "s1");
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

    let recording = Arc::new(RecordingSession::new());
    recording.create_recording(&conn, &owner, "take-1").unwrap();

    let mut bus = EventBus::new();
    bus.subscribe_all(Arc::new(Tracer::new()));
    bus.subscribe(EventKind::LlmCallEnd, recording.clone());
    bus.subscribe(EventKind::LlmCallEnd, Arc::new(AlwaysFails));

    let event = Event::new(EventKind::LlmCallEnd, owner.clone());
    let result = bus.publish(&event, Some(&conn));
    assert!(result.is_err());

    let branch = branches::get_branch(&conn, branch_id).unwrap().unwrap();
    assert_eq!(branch.head_node_id, None, "tracer's node insert must be rolled back");

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0)).unwrap();
    assert_eq!(count, 0);

    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM at_llm_call_details", [], |row| row.get(0)).unwrap();
    assert_eq!(count, 0, "recording sidecar insert must be rolled back too");
}

/// The recording session only reads the branch head the tracer advanced
/// for the *same* event; this exercises the full tracer -> recording
/// session pipeline end to end, including step counting.
#[test]
fn successful_publish_advances_branch_and_records_a_step() {
    let conn = SqliteConnection::open_in_memory().unwrap();
    agentgit_store::test_support::init_schema_for_tests(&conn).unwrap();

    let owner = Owner::new("bob", "s2");
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

    let recording = Arc::new(RecordingSession::new());
    let rec = recording.create_recording(&conn, &owner, "take-1").unwrap();

    let mut bus = EventBus::new();
    bus.subscribe_all(Arc::new(Tracer::new()));
    bus.subscribe(EventKind::LlmCallEnd, recording.clone());

    let event = Event::new(EventKind::LlmCallEnd, owner.clone());
    bus.publish(&event, Some(&conn)).unwrap();

    let details = agentgit_store::dag::recordings::list_llm_call_details(
        &conn,
        &rec.recording_id,
    )
    .unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].step_index, 0);
}
