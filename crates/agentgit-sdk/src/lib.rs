//! agentgit-sdk: the embeddable façade over the tracer, DAG store,
//! snapshot store and record-replay pipeline.
//!
//! [`Session::open`] wires every component onto one bus and one sqlite
//! connection; everything else in the workspace is reached through the
//! resulting [`Session`].

mod error;
mod session;

pub use error::{Error, Result};
pub use session::Session;

pub use agentgit_bus::Subscriber;
pub use agentgit_types::{
    ActionType, Branch, BranchStatus, CallerType, Checkpoint, ComparisonResult, Event, EventKind,
    ExecutionNode, LlmCallDetail, Owner, Recording, RecordingStatus, Tag, TagType, Value,
};
