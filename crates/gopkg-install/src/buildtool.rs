//! Adapter for the host build tool's dependency graph.
//!
//! The installer only needs five edits; [`GoModTool`] performs them with
//! `go mod` subprocesses in the project directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::BuildToolError;

/// Edits applied to the build tool's module file.
pub trait BuildTool: Send + Sync {
    /// Create the module file for project `name` if it does not exist.
    fn ensure_module(&self, name: &str) -> Result<(), BuildToolError>;

    /// Require `module` at `version`.
    fn add_requirement(&self, module: &str, version: &str) -> Result<(), BuildToolError>;

    /// Point `module` at a local directory.
    fn add_path_override(&self, module: &str, path: &str) -> Result<(), BuildToolError>;

    fn drop_requirement(&self, module: &str) -> Result<(), BuildToolError>;

    fn drop_path_override(&self, module: &str) -> Result<(), BuildToolError>;
}

/// Runs `go mod init` / `go mod edit` in a project directory.
#[derive(Debug, Clone)]
pub struct GoModTool {
    program: PathBuf,
    dir: PathBuf,
}

impl GoModTool {
    pub fn new(dir: PathBuf) -> Self {
        GoModTool {
            program: PathBuf::from("go"),
            dir,
        }
    }

    /// Use a different executable in place of `go`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn run(&self, args: &[&str]) -> Result<(), BuildToolError> {
        let command = format!("{} {}", self.program.display(), args.join(" "));
        tracing::debug!(command = %command, dir = %self.dir.display(), "running build tool");
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|source| BuildToolError::Spawn {
                command: command.clone(),
                source,
            })?;
        if output.status.success() {
            return Ok(());
        }
        Err(BuildToolError::Failed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl BuildTool for GoModTool {
    fn ensure_module(&self, name: &str) -> Result<(), BuildToolError> {
        if self.dir.join("go.mod").is_file() {
            return Ok(());
        }
        self.run(&["mod", "init", name])
    }

    fn add_requirement(&self, module: &str, version: &str) -> Result<(), BuildToolError> {
        self.run(&["mod", "edit", &format!("-require={module}@{version}")])
    }

    fn add_path_override(&self, module: &str, path: &str) -> Result<(), BuildToolError> {
        self.run(&["mod", "edit", &format!("-replace={module}={path}")])
    }

    fn drop_requirement(&self, module: &str) -> Result<(), BuildToolError> {
        self.run(&["mod", "edit", &format!("-droprequire={module}")])
    }

    fn drop_path_override(&self, module: &str) -> Result<(), BuildToolError> {
        self.run(&["mod", "edit", &format!("-dropreplace={module}")])
    }
}
