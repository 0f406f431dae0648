//! Process-local, transactional publish/subscribe for agentgit events.
//!
//! The tracer appends a node and the recording session reads the freshly
//! advanced branch head in the *same* event, so both must share
//! transactional fate: a partial write would leave a sidecar row pointing
//! at a phantom node, or a branch head pointing past a rolled-back node.

mod bus;
mod error;
mod logger;

pub use bus::{subscriber_error, EventBus, Subscriber};
pub use error::{Error, Result};
pub use logger::{LogLevel, Logger, NoopLogger};

pub use rusqlite::Connection;
