//! Layout service that turns dot source into an SVG document.
//!
//! The production implementation pipes the source through the Graphviz
//! command line (`dot -Tsvg`). Everything that needs a layout goes through
//! the [`LayoutService`] trait so the watch loop can be driven without
//! Graphviz installed.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Errors raised while producing a layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Graphviz command `{command}` was not found on PATH")]
    NotInstalled { command: String },
    #[error("Failed to run layout command: {0}")]
    Spawn(#[from] std::io::Error),
    /// Graphviz rejected the source. The message is its stderr, verbatim.
    #[error("{stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("Layout command produced no output")]
    EmptyOutput,
}

/// Converts dot source text into SVG bytes.
pub trait LayoutService {
    fn render(&self, source: &str) -> Result<Vec<u8>, LayoutError>;
}

/// Layout service backed by the Graphviz executables.
#[derive(Debug, Clone)]
pub struct GraphvizCli {
    command: String,
    engine: Option<String>,
}

impl GraphvizCli {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            engine: None,
        }
    }

    /// Select a layout engine other than the command's default.
    pub fn with_engine(mut self, engine: Option<String>) -> Self {
        self.engine = engine.filter(|e| !e.trim().is_empty());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec!["-Tsvg".to_string()];
        if let Some(engine) = &self.engine {
            args.push(format!("-K{}", engine));
        }
        args
    }

    fn resolve(&self) -> Result<PathBuf, LayoutError> {
        which::which(&self.command).map_err(|_| LayoutError::NotInstalled {
            command: self.command.clone(),
        })
    }
}

impl Default for GraphvizCli {
    fn default() -> Self {
        Self::new("dot")
    }
}

impl LayoutService for GraphvizCli {
    fn render(&self, source: &str) -> Result<Vec<u8>, LayoutError> {
        let program = self.resolve()?;

        let mut child = Command::new(program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from a helper thread so a large graph cannot fill the
        // stdout pipe while we are still writing.
        let stdin = child.stdin.take();
        let output = std::thread::scope(|scope| {
            if let Some(mut stdin) = stdin {
                scope.spawn(move || {
                    // A write error means the child exited early; its stderr says why.
                    let _ = stdin.write_all(source.as_bytes());
                });
            }
            child.wait_with_output()
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(LayoutError::Failed {
                code: output.status.code(),
                stderr: if stderr.is_empty() {
                    format!("Layout command exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }

        if output.stdout.is_empty() {
            return Err(LayoutError::EmptyOutput);
        }

        Ok(output.stdout)
    }
}
