//! Subprocess runner for external scoring tools.
//!
//! The scorer is driven through a [`ToolRunner`] so the file contract can be
//! exercised without a Java runtime. [`ProcessRunner`] is the real thing.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{MetricError, MetricResult};

/// One external tool run.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Executable name or path
    pub program: String,
    /// Arguments, in order
    pub args: Vec<OsString>,
    /// Working directory for the process
    pub working_dir: PathBuf,
    /// Kill the process after this long
    pub timeout: Option<Duration>,
}

impl ToolInvocation {
    /// Render the command line for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs an external tool to completion.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the invocation and return its exit status.
    ///
    /// Implementations must not return until the process has exited (or been
    /// killed on timeout).
    async fn run(&self, invocation: &ToolInvocation) -> MetricResult<ExitStatus>;
}

/// Runs tools as child processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> MetricResult<ExitStatus> {
        let spawn_err = |source: std::io::Error| MetricError::Spawn {
            program: invocation.program.clone(),
            source,
        };

        let mut child = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        let Some(limit) = invocation.timeout else {
            return child.wait().await.map_err(spawn_err);
        };

        let waited = tokio::time::timeout(limit, child.wait()).await;
        match waited {
            Ok(status) => status.map_err(spawn_err),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill {}: {}", invocation.program, e);
                }
                Err(MetricError::Timeout {
                    program: invocation.program.clone(),
                    timeout_ms: limit.as_millis() as u64,
                })
            }
        }
    }
}
