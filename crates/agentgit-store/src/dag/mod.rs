pub mod branches;
pub mod checkpoints;
pub mod comparisons;
pub mod nodes;
pub mod recordings;
pub mod tags;

use std::path::Path;

use rusqlite::Connection;

use crate::schema;
use crate::Result;

/// Persists nodes, branches and checkpoint metadata (plus the record-replay
/// sidecar tables) on a single shared connection. All mutations on this
/// connection participate in the bus's transaction; read-only queries here
/// are opportunistic.
pub struct DagStore {
    conn: Connection,
}

impl DagStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// The shared connection, bound to `EventBus::publish` so tracer and
    /// recording-session writes commit atomically with every other
    /// subscriber's writes for the same event.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
