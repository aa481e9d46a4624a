//! External tool invocation for the compiler and linter channels

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{EngineError, Result};

/// A command line to run inside a project root
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub stdin: Option<String>,
}

/// What a finished tool printed
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Run to completion; a non-zero exit is not an error
    pub async fn run(&self) -> Result<ToolOutput> {
        debug!(program = %self.program.display(), args = ?self.args, "running tool");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.cwd)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Tool {
                program: self.program_name(),
                message: e.to_string(),
            })?;

        // Stdin is written while the output pipes drain
        let writer = match (&self.stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => {
                let input = input.clone();
                Some(tokio::spawn(async move {
                    let written = pipe.write_all(input.as_bytes()).await;
                    drop(pipe);
                    written
                }))
            }
            _ => None,
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| EngineError::Tool {
                program: self.program_name(),
                message: e.to_string(),
            })?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!(program = %self.program.display(), "tool exited before reading all of stdin");
                }
                Ok(Err(e)) => {
                    return Err(EngineError::Tool {
                        program: self.program_name(),
                        message: format!("failed to write stdin: {}", e),
                    })
                }
                Err(e) => {
                    return Err(EngineError::Tool {
                        program: self.program_name(),
                        message: format!("stdin writer failed: {}", e),
                    })
                }
            }
        }

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
