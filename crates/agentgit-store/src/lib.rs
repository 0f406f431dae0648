pub mod dag;
mod error;
pub mod json;
pub mod schema;
mod snapshot;

pub use dag::DagStore;
pub use error::{Error, Result};
pub use snapshot::{BlobId, CommitId, SnapshotStore, TreeId};

/// Schema bootstrapping for crates that open their own connection onto the
/// shared transaction (the tracer and recording session operate on the
/// bus's connection directly, not through `DagStore`).
pub mod test_support {
    pub fn init_schema_for_tests(conn: &rusqlite::Connection) -> crate::Result<()> {
        crate::schema::init_schema(conn)
    }
}
