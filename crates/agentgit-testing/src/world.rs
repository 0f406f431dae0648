//! `TestWorld` pattern for declarative in-process test setup.
//!
//! Wraps one [`agentgit_sdk::Session`] over a temp-dir-backed
//! `.agentgit/` layout so integration tests exercise the exact same
//! bus/store/snapshot wiring a real embedder would, without touching
//! the machine's real home or project directories.

use std::path::{Path, PathBuf};

use agentgit_sdk::Session;
use tempfile::TempDir;

/// Builder for constructing a [`TestWorld`] with fine-grained control.
pub struct TestWorldBuilder {
    root: Option<PathBuf>,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Use a caller-supplied root instead of a fresh temp dir — useful
    /// for tests that want to inspect `.agentgit/` after the test body
    /// runs, or that reopen a `Session` over the same root twice.
    pub fn in_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn build(self) -> TestWorld {
        let (temp_dir, root) = match self.root {
            Some(root) => (None, root),
            None => {
                let temp_dir = TempDir::new().expect("failed to create temp dir");
                let root = temp_dir.path().to_path_buf();
                (Some(temp_dir), root)
            }
        };
        let session = Session::open(&root).expect("failed to open session");
        TestWorld { _temp_dir: temp_dir, root, session }
    }
}

/// A self-contained `agentgit` project root plus the `Session` opened
/// over it. Dropping `TestWorld` cleans up the temp dir (when one was
/// used) along with it.
pub struct TestWorld {
    _temp_dir: Option<TempDir>,
    root: PathBuf,
    pub session: Session,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn builder() -> TestWorldBuilder {
        TestWorldBuilder::new()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
