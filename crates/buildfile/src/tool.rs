use crate::error::{BuildFileError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Captured result of one tool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// The external build tool, reduced to "run with these arguments here".
#[async_trait]
pub trait BuildTool: Send + Sync {
    async fn invoke(&self, args: &[String], cwd: &Path) -> Result<ToolOutput>;
}

/// Runs the real `meson` binary
#[derive(Debug, Clone)]
pub struct MesonTool {
    program: String,
    timeout: Option<Duration>,
}

impl Default for MesonTool {
    fn default() -> Self {
        Self::new("meson")
    }
}

impl MesonTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl BuildTool for MesonTool {
    async fn invoke(&self, args: &[String], cwd: &Path) -> Result<ToolOutput> {
        log::debug!("Running {} {} in {}", self.program, args.join(" "), cwd.display());
        let mut command = Command::new(&self.program);
        command.args(args).current_dir(cwd).kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => timeout(limit, command.output())
                .await
                .map_err(|_| BuildFileError::Timeout(limit))?,
            None => command.output().await,
        }
        .map_err(|source| BuildFileError::Launch {
            program: self.program.clone(),
            source,
        })?;

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let tool = MesonTool::new("definitely-not-a-real-build-tool-binary");
        let err = tool
            .invoke(&["--version".to_string()], Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildFileError::Launch { .. }));
    }

    #[test]
    fn test_success_requires_zero_status() {
        assert!(ToolOutput { status: Some(0), ..Default::default() }.success());
        assert!(!ToolOutput { status: Some(1), ..Default::default() }.success());
        assert!(!ToolOutput { status: None, ..Default::default() }.success());
    }
}
