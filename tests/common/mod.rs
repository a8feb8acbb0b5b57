//! Shared test infrastructure: a throwaway git-backed registry driven
//! through the compiled binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub struct RegistryFixture {
    dir: TempDir,
}

impl RegistryFixture {
    /// Create an empty registry repo, or `None` when git is unavailable
    /// (the caller should skip its test).
    pub fn new() -> Option<Self> {
        if !git_available() {
            eprintln!("Skipping: git not found on PATH");
            return None;
        }
        let dir = tempfile::tempdir().expect("create temp registry");
        let fixture = RegistryFixture { dir };
        fixture.git(&["init", "-q"]);
        fixture.git(&["config", "user.email", "ci@example.com"]);
        fixture.git(&["config", "user.name", "ci"]);
        Some(fixture)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `ports/<port>/port.json` in canonical form (sorted keys,
    /// 2-space indentation, trailing newline).
    pub fn write_manifest(&self, port: &str, version_field: &str, text: &str, port_version: u32) {
        let body = if port_version == 0 {
            format!("{{\n  \"name\": \"{port}\",\n  \"{version_field}\": \"{text}\"\n}}\n")
        } else {
            format!(
                "{{\n  \"name\": \"{port}\",\n  \"port-version\": {port_version},\n  \
                 \"{version_field}\": \"{text}\"\n}}\n"
            )
        };
        self.write_file(&format!("ports/{port}/port.json"), &body);
    }

    pub fn write_file(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).expect("create parent dirs");
        fs::write(&path, contents).expect("write fixture file");
    }

    pub fn read_file(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).expect("read fixture file")
    }

    #[allow(dead_code)]
    pub fn remove_file(&self, rel: &str) {
        fs::remove_file(self.path(rel)).expect("remove fixture file");
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn commit_all(&self) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", "update ports", "--allow-empty"]);
    }

    /// Tree object id of the port directory as committed at HEAD.
    pub fn tree_sha(&self, port: &str) -> String {
        let output = self.git_output(&["rev-parse", &format!("HEAD:ports/{port}")]);
        assert!(output.status.success(), "rev-parse failed for {port}");
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Run the compiled binary with the fixture registry as CWD.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_portv"))
            .args(args)
            .current_dir(self.root())
            .output()
            .expect("run portv")
    }

    fn git(&self, args: &[&str]) {
        let output = self.git_output(args);
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn git_output(&self, args: &[&str]) -> Output {
        Command::new("git")
            .arg("-C")
            .arg(self.root())
            .args(args)
            .output()
            .expect("run git")
    }
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
