use std::path::{Path, PathBuf};

use agentgit_types::Owner;

use crate::error::Result;

/// Everything lives under `<project>/.agentgit/`.
pub struct Layout {
    pub root: PathBuf,
}

impl Layout {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            root: project_root.into().join(".agentgit"),
        }
    }

    pub fn dag_sqlite(&self) -> PathBuf {
        self.root.join("dag.sqlite")
    }

    pub fn snapshots_git(&self) -> PathBuf {
        self.root.join("snapshots.git")
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.root.join("workspaces")
    }

    /// The workspace directory for `owner`: for the sentinel owner
    /// (`default`, `default`) this is the project directory itself (CLI
    /// convenience); otherwise a per-owner directory is created under
    /// `workspaces/<user_id>/<session_id>/`.
    pub fn workspace_for(&self, owner: &Owner) -> Result<PathBuf> {
        if owner.is_default_sentinel() {
            let project_dir = self
                .root
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            return Ok(project_dir);
        }

        let dir = self
            .workspaces_dir()
            .join(&owner.user_id)
            .join(&owner.session_id);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.workspaces_dir())?;
        Ok(())
    }
}

/// Path components that snapshot walks never descend into.
pub const IGNORED_DIR_NAMES: &[&str] =
    &[".agentgit", ".git", ".hg", ".svn", "target", "node_modules", "__pycache__"];

/// File suffixes that snapshot walks never include.
pub const IGNORED_SUFFIXES: &[&str] = &[".pyc", ".DS_Store"];

pub fn is_ignored_component(name: &str) -> bool {
    IGNORED_DIR_NAMES.contains(&name)
}

pub fn is_ignored_suffix(name: &str) -> bool {
    IGNORED_SUFFIXES.iter().any(|suf| name.ends_with(suf))
}

/// Resolve the workspace data directory path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. AGENTGIT_PATH environment variable (with tilde expansion)
/// 3. System data directory
/// 4. ~/.agentgit (fallback)
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("AGENTGIT_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("agentgit"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".agentgit"));
    }

    Err(crate::error::Error::Config(
        "could not determine workspace path: no HOME directory or system data directory found"
            .to_string(),
    ))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_owner_uses_project_dir() {
        let layout = Layout::new("/tmp/my-project");
        let ws = layout.workspace_for(&Owner::default_sentinel()).unwrap();
        assert_eq!(ws, PathBuf::from("/tmp/my-project"));
    }

    #[test]
    fn non_sentinel_owner_gets_per_session_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let owner = Owner::new("alice", "session-1");
        let ws = layout.workspace_for(&owner).unwrap();
        assert_eq!(
            ws,
            tmp.path().join(".agentgit/workspaces/alice/session-1")
        );
        assert!(ws.exists());
    }

    #[test]
    fn ignore_sets_cover_vcs_and_build_output() {
        assert!(is_ignored_component(".git"));
        assert!(is_ignored_component("target"));
        assert!(!is_ignored_component("src"));
        assert!(is_ignored_suffix("module.pyc"));
        assert!(!is_ignored_suffix("module.py"));
    }
}
