use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use agentgit_core::{is_ignored_component, is_ignored_suffix};
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;
use crate::Result;

pub type BlobId = String;
pub type TreeId = String;
pub type CommitId = String;

/// A bare, append-only, content-addressed repository, isolated from any
/// VCS the workspace itself may be under. Every write becomes visible only
/// after the underlying `git` subprocess exits successfully, so snapshots
/// are never partially materialised.
pub struct SnapshotStore {
    repo_path: PathBuf,
}

impl SnapshotStore {
    /// Opens (initializing if absent) a bare repository at `repo_path`.
    pub fn open(repo_path: impl Into<PathBuf>) -> Result<Self> {
        let repo_path = repo_path.into();
        if !repo_path.join("HEAD").exists() {
            std::fs::create_dir_all(&repo_path)?;
            run_git(&repo_path, None, &["init", "--bare", "-q"])?;
        }
        Ok(Self { repo_path })
    }

    pub fn path(&self) -> &Path {
        &self.repo_path
    }

    /// Hashes `bytes` into the object database, returning the blob id.
    pub fn hash_blob(&self, bytes: &[u8]) -> Result<BlobId> {
        let output = run_git_with_stdin(
            &self.repo_path,
            None,
            &["hash-object", "-w", "--stdin"],
            bytes,
        )?;
        Ok(first_line(&output.stdout))
    }

    /// Builds a tree object from a map of relative path to blob id,
    /// grouping by first path component and recursing, entries sorted by
    /// name for deterministic tree hashes.
    pub fn build_tree(&self, entries: &BTreeMap<PathBuf, BlobId>) -> Result<TreeId> {
        self.build_tree_level(entries)
    }

    fn build_tree_level(&self, entries: &BTreeMap<PathBuf, BlobId>) -> Result<TreeId> {
        let mut top_level_blobs: BTreeMap<String, BlobId> = BTreeMap::new();
        let mut subdirs: BTreeMap<String, BTreeMap<PathBuf, BlobId>> = BTreeMap::new();

        for (path, blob) in entries {
            let mut components = path.components();
            let first = components
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .ok_or_else(|| Error::Snapshot("empty path in tree entries".into()))?;
            let rest: PathBuf = components.collect();
            if rest.as_os_str().is_empty() {
                top_level_blobs.insert(first, blob.clone());
            } else {
                subdirs.entry(first).or_default().insert(rest, blob.clone());
            }
        }

        let mut lines = Vec::new();
        for (name, blob) in &top_level_blobs {
            lines.push(format!("100644 blob {blob}\t{name}"));
        }
        for (name, children) in &subdirs {
            let subtree = self.build_tree_level(children)?;
            lines.push(format!("040000 tree {subtree}\t{name}"));
        }
        lines.sort();

        let input = lines.join("\n");
        let output = run_git_with_stdin(
            &self.repo_path,
            None,
            &["mktree"],
            input.as_bytes(),
        )?;
        Ok(first_line(&output.stdout))
    }

    /// Creates a commit over `tree`, with an optional parent commit id;
    /// the parent is a pure input, this store holds no "last snapshot"
    /// pointer so callers orchestrate chaining themselves.
    pub fn commit_tree(
        &self,
        tree: &TreeId,
        parent: Option<&CommitId>,
        message: &str,
    ) -> Result<CommitId> {
        let mut args: Vec<&str> = vec!["commit-tree", tree];
        if let Some(parent) = parent {
            args.push("-p");
            args.push(parent);
        }
        args.push("-m");
        args.push(message);
        let output = run_git(&self.repo_path, None, &args)?;
        Ok(first_line(&output.stdout))
    }

    /// Restores `commit` into `workspace`. Uses a private, per-operation
    /// index file so concurrent restores into different workspaces never
    /// contend on a shared index; the index file is removed afterwards
    /// regardless of outcome.
    pub fn restore_commit(&self, commit: &CommitId, workspace: &Path) -> Result<()> {
        std::fs::create_dir_all(workspace)?;
        let index_dir = self.repo_path.join(".index-tmp");
        std::fs::create_dir_all(&index_dir)?;
        let index_file =
            index_dir.join(format!("{}-{}", std::process::id(), uuid::Uuid::new_v4()));

        let result = (|| -> Result<()> {
            run_git_indexed(
                &self.repo_path,
                None,
                &index_file,
                &["read-tree", commit],
            )?;
            let prefix = format!("{}/", workspace.display());
            run_git_indexed(
                &self.repo_path,
                Some(workspace),
                &index_file,
                &["checkout-index", "-a", "-f", &format!("--prefix={prefix}")],
            )?;
            Ok(())
        })();

        let _ = std::fs::remove_file(&index_file);
        result
    }

    /// Lists every file path recorded in `commit`.
    pub fn list_files(&self, commit: &CommitId) -> Result<Vec<PathBuf>> {
        let output = run_git(&self.repo_path, None, &["ls-tree", "-r", "--name-only", commit])?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(PathBuf::from)
            .collect())
    }

    /// Walks `workspace` recursively, hashing every file not excluded by
    /// the ignore sets, and returns the resulting path-to-blob map ready
    /// for `build_tree`.
    pub fn snapshot_workspace(&self, workspace: &Path) -> Result<BTreeMap<PathBuf, BlobId>> {
        let mut entries = BTreeMap::new();
        let walker = WalkDir::new(workspace).into_iter().filter_entry(keep_entry);

        for entry in walker {
            let entry = entry.map_err(|e| Error::Snapshot(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if is_ignored_suffix(&name) {
                continue;
            }

            let bytes = std::fs::read(entry.path())?;
            let blob = self.hash_blob(&bytes)?;
            let rel = entry.path().strip_prefix(workspace).unwrap_or(entry.path()).to_path_buf();
            entries.insert(rel, blob);
        }
        Ok(entries)
    }
}

/// `filter_entry` predicate excluding ignored directory components; the
/// root entry itself is always kept so the walk can start.
fn keep_entry(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return true;
    }
    entry.depth() == 0 || !is_ignored_component(&entry.file_name().to_string_lossy())
}

fn first_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).lines().next().unwrap_or("").to_string()
}

fn run_git(dir: &Path, work_tree: Option<&Path>, args: &[&str]) -> Result<Output> {
    let mut cmd = Command::new("git");
    cmd.arg(format!("--git-dir={}", dir.display()));
    if let Some(wt) = work_tree {
        cmd.arg(format!("--work-tree={}", wt.display()));
    }
    cmd.args(args);
    let output = cmd.output().map_err(Error::Io)?;
    check_status(&output, args)?;
    Ok(output)
}

fn run_git_with_stdin(
    dir: &Path,
    work_tree: Option<&Path>,
    args: &[&str],
    stdin: &[u8],
) -> Result<Output> {
    use std::io::Write;
    use std::process::Stdio;

    let mut cmd = Command::new("git");
    cmd.arg(format!("--git-dir={}", dir.display()));
    if let Some(wt) = work_tree {
        cmd.arg(format!("--work-tree={}", wt.display()));
    }
    cmd.args(args);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(Error::Io)?;
    child
        .stdin
        .take()
        .expect("stdin piped")
        .write_all(stdin)
        .map_err(Error::Io)?;
    let output = child.wait_with_output().map_err(Error::Io)?;
    check_status(&output, args)?;
    Ok(output)
}

fn run_git_indexed(
    dir: &Path,
    work_tree: Option<&Path>,
    index_file: &Path,
    args: &[&str],
) -> Result<Output> {
    let mut cmd = Command::new("git");
    cmd.arg(format!("--git-dir={}", dir.display()));
    if let Some(wt) = work_tree {
        cmd.arg(format!("--work-tree={}", wt.display()));
    }
    cmd.env("GIT_INDEX_FILE", index_file);
    cmd.args(args);
    let output = cmd.output().map_err(Error::Io)?;
    check_status(&output, args)?;
    Ok(output)
}

fn check_status(output: &Output, args: &[&str]) -> Result<()> {
    if !output.status.success() {
        return Err(Error::Snapshot(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_list_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(tmp.path().join("snapshots.git")).unwrap();

        let blob = store.hash_blob(b"hello world").unwrap();
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("a/b.txt"), blob.clone());
        entries.insert(PathBuf::from("c.txt"), blob);

        let tree = store.build_tree(&entries).unwrap();
        let commit = store.commit_tree(&tree, None, "initial").unwrap();

        let mut files = store.list_files(&commit).unwrap();
        files.sort();
        assert_eq!(files, vec![PathBuf::from("a/b.txt"), PathBuf::from("c.txt")]);
    }

    #[test]
    fn restore_materialises_files_into_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(tmp.path().join("snapshots.git")).unwrap();

        let blob = store.hash_blob(b"content").unwrap();
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("file.txt"), blob);
        let tree = store.build_tree(&entries).unwrap();
        let commit = store.commit_tree(&tree, None, "snap").unwrap();

        let workspace = tmp.path().join("workspace");
        store.restore_commit(&commit, &workspace).unwrap();

        let restored = std::fs::read_to_string(workspace.join("file.txt")).unwrap();
        assert_eq!(restored, "content");
    }

    #[test]
    fn snapshot_workspace_skips_ignored_components() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(tmp.path().join("snapshots.git")).unwrap();

        let workspace = tmp.path().join("ws");
        std::fs::create_dir_all(workspace.join(".git")).unwrap();
        std::fs::write(workspace.join(".git/config"), "ignored").unwrap();
        std::fs::write(workspace.join("keep.txt"), "kept").unwrap();
        std::fs::write(workspace.join("cache.pyc"), "ignored").unwrap();

        let entries = store.snapshot_workspace(&workspace).unwrap();
        let paths: Vec<&PathBuf> = entries.keys().collect();
        assert_eq!(paths, vec![&PathBuf::from("keep.txt")]);
    }
}
