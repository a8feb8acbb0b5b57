//! Git plumbing: committed-tree hashing and the content-addressable store.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Read access to the registry's content-addressable store.
///
/// `fetch` returns `Ok(None)` when the addressed object is absent and
/// `Err` only when the store itself cannot be queried.
pub trait ContentStore {
    fn fetch(&self, treeish: &str) -> Result<Option<Vec<u8>>>;
}

/// The registry's own git object database.
pub struct GitContentStore {
    repo_root: PathBuf,
}

impl GitContentStore {
    pub fn new(repo_root: &Path) -> Self {
        GitContentStore {
            repo_root: repo_root.to_path_buf(),
        }
    }
}

impl ContentStore for GitContentStore {
    fn fetch(&self, treeish: &str) -> Result<Option<Vec<u8>>> {
        let output = run_git(&self.repo_root, &["show", treeish])?;
        if output.status.success() {
            Ok(Some(output.stdout))
        } else {
            tracing::debug!(treeish, stderr = %stderr_line(&output), "object not found");
            Ok(None)
        }
    }
}

/// Tree object id of `rel_dir` as committed at HEAD, or `None` when the
/// path has no committed state yet.
///
/// The hash deliberately comes from HEAD rather than the working tree:
/// recording a version must pin content that is actually committed, and
/// comparing the committed tree against the locally declared version is
/// what exposes forgotten commits.
pub fn committed_tree_sha(repo_root: &Path, rel_dir: &str) -> Result<Option<String>> {
    let rev = format!("HEAD:{rel_dir}");
    let output = run_git(repo_root, &["rev-parse", &rev])?;
    if !output.status.success() {
        tracing::debug!(rel_dir, stderr = %stderr_line(&output), "no committed tree");
        return Ok(None);
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !is_tree_sha(&sha) {
        bail!("git rev-parse {rev} produced unexpected output: {sha}");
    }
    Ok(Some(sha))
}

/// Exactly 40 lowercase hex characters.
pub fn is_tree_sha(text: &str) -> bool {
    text.len() == 40
        && text
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn run_git(repo_root: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(args)
        .output()
        .with_context(|| format!("run git {}", args.join(" ")))
}

fn stderr_line(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr.lines().next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_sha_shape() {
        assert!(is_tree_sha(&"a".repeat(40)));
        assert!(is_tree_sha("0123456789abcdef0123456789abcdef01234567"));
        assert!(!is_tree_sha(&"a".repeat(39)));
        assert!(!is_tree_sha(&"a".repeat(41)));
        assert!(!is_tree_sha(&"A".repeat(40)));
        assert!(!is_tree_sha(&"g".repeat(40)));
    }
}
