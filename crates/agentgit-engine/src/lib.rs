mod adapter;
mod aligner;
mod comparator;
mod error;
mod fingerprint;
mod recording_session;
mod tracer;

pub use adapter::FrameworkAdapter;
pub use aligner::{align, AlignedPair};
pub use comparator::{compare, ComparatorConfig, ComparedStep, EmbeddingModel};
pub use error::{Error, Result};
pub use fingerprint::{compute_fingerprint, extract_message_roles, extract_tool_names};
pub use recording_session::RecordingSession;
pub use tracer::Tracer;
