//! In-process test harness shared by `agentgit`'s integration tests.
//!
//! Not published, not meant to be depended on outside this workspace —
//! the API surface here changes to fit whatever the integration suites
//! need next.

pub mod assertions;
pub mod fixtures;
pub mod providers;
mod world;

pub use world::{TestWorld, TestWorldBuilder};
