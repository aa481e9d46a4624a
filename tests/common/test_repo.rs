//! TestRepo builder for integration testing
//!
//! Creates Elm applications and packages in temp directories, with helpers
//! to address their files by uri and to run the CLI inside them.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

use elm_intel::document::uri_from_path;

pub const APPLICATION_MANIFEST: &str = r#"{
    "type": "application",
    "source-directories": ["src"],
    "elm-version": "0.19.1",
    "dependencies": {
        "direct": {"elm/core": "1.0.5", "elm/html": "1.0.0"},
        "indirect": {}
    },
    "test-dependencies": {"direct": {}, "indirect": {}}
}"#;

pub const PACKAGE_MANIFEST: &str = r#"{
    "type": "package",
    "name": "test/pkg",
    "summary": "test package",
    "license": "BSD-3-Clause",
    "version": "1.0.0",
    "exposed-modules": [],
    "elm-version": "0.19.0 <= v < 0.20.0",
    "dependencies": {"elm/core": "1.0.0 <= v < 2.0.0"},
    "test-dependencies": {}
}"#;

/// Builder for creating Elm project structures
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// An application with `source-directories: ["src"]`
    pub fn application() -> Self {
        let repo = Self::new();
        repo.add_file("elm.json", APPLICATION_MANIFEST);
        repo
    }

    pub fn package() -> Self {
        let repo = Self::new();
        repo.add_file("elm.json", PACKAGE_MANIFEST);
        repo
    }

    /// Get the path to the repository root
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file_path(&self, relative_path: &str) -> PathBuf {
        self.dir.path().join(relative_path)
    }

    /// Uri of a file in the repository
    pub fn uri(&self, relative_path: &str) -> String {
        uri_from_path(&self.file_path(relative_path))
    }

    /// Add a file with the given content
    pub fn add_file(&self, relative_path: &str, content: &str) -> &Self {
        let full_path = self.dir.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        self
    }

    /// Add `src/<Module/Path>.elm`
    pub fn add_module(&self, module: &str, content: &str) -> &Self {
        let relative = format!("src/{}.elm", module.replace('.', "/"));
        self.add_file(&relative, content)
    }

    pub fn remove_file(&self, relative_path: &str) -> &Self {
        fs::remove_file(self.file_path(relative_path)).expect("Failed to remove file");
        self
    }

    /// Run the elm-intel CLI in this repository
    pub fn run_cli(&self, args: &[&str]) -> std::io::Result<Output> {
        Command::new(env!("CARGO_BIN_EXE_elm-intel"))
            .current_dir(self.path())
            .env_remove("RUST_LOG")
            .args(args)
            .output()
    }

    /// Run CLI and expect success, return stdout
    pub fn run_cli_success(&self, args: &[&str]) -> String {
        let output = self.run_cli(args).expect("Failed to run CLI");
        assert!(
            output.status.success(),
            "CLI command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Run CLI and expect failure, return (exit code, stderr)
    pub fn run_cli_failure(&self, args: &[&str]) -> (Option<i32>, String) {
        let output = self.run_cli(args).expect("Failed to run CLI");
        assert!(
            !output.status.success(),
            "CLI command {:?} should have failed",
            args
        );
        (
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        )
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
