use crate::diagnostics::{classify, sentinel_line, Classification, DiagnosticKind};
use crate::error::{BuildFileError, Result};
use crate::tool::BuildTool;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Replaced by the quoted project directory on append
pub const WORKDIR_MARKER: &str = "$BUILDFILE_DIR$";

const BUILD_FILE: &str = "meson.build";

/// Settings for the generated project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildFileConfig {
    pub project_name: String,
    pub languages: Vec<String>,
    /// Arguments of the one-time setup step, run in the project directory
    pub setup_args: Vec<String>,
    /// Arguments of the per-probe step, run in the build directory
    pub reconfigure_args: Vec<String>,
    pub build_dir: String,
    pub warnings_as_errors: bool,
    /// Files and directories copied into the project before setup
    pub fixtures: Option<PathBuf>,
}

impl Default for BuildFileConfig {
    fn default() -> Self {
        Self {
            project_name: "generated".to_string(),
            languages: vec!["c".to_string(), "java".to_string()],
            setup_args: vec!["setup".to_string(), "builddir".to_string()],
            reconfigure_args: vec!["--reconfigure".to_string()],
            build_dir: "builddir".to_string(),
            warnings_as_errors: false,
            fixtures: None,
        }
    }
}

impl BuildFileConfig {
    /// `project('generated', ['c', 'java'])`
    pub fn project_line(&self) -> String {
        let languages: Vec<String> = self.languages.iter().map(|l| format!("'{l}'")).collect();
        format!("project('{}', [{}])", self.project_name, languages.join(", "))
    }
}

/// Result of one probe. `offset` is relative to the first candidate line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub offset: Option<i64>,
    pub message: String,
    pub kind: DiagnosticKind,
    pub stdout: String,
    pub stderr: String,
}

impl ProbeOutcome {
    pub fn passed(&self) -> bool {
        self.offset.is_none()
    }

    fn from_classification(c: Classification, lines_before: usize, stdout: String, stderr: String) -> Self {
        Self {
            offset: c.line.map(|line| line as i64 - lines_before as i64 - 1),
            message: c.message,
            kind: c.kind,
            stdout,
            stderr,
        }
    }

    fn timed_out(limit: Duration) -> Self {
        Self {
            offset: Some(0),
            message: format!("Meson did not finish within {limit:?}"),
            kind: DiagnosticKind::Timeout,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// A `meson.build` inside a configured project, mutated speculatively.
///
/// Every probe restores the file to its exact pre-probe content before
/// returning, whatever the tool did.
pub struct TransactionalBuildFile {
    dir: TempDir,
    path: PathBuf,
    config: BuildFileConfig,
    tool: Box<dyn BuildTool>,
    snapshot: Option<String>,
}

impl std::fmt::Debug for TransactionalBuildFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionalBuildFile")
            .field("dir", &self.dir.path())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TransactionalBuildFile {
    /// Create the project directory, write the `project()` line, copy
    /// fixtures and run the setup step once.
    pub async fn create(config: BuildFileConfig, tool: Box<dyn BuildTool>) -> Result<Self> {
        let dir = TempDir::new()?;
        let path = dir.path().join(BUILD_FILE);
        fs::write(&path, "")?;
        log::info!("Setting up directory: '{}'", dir.path().display());

        let mut file = Self {
            dir,
            path,
            config,
            tool,
            snapshot: None,
        };
        let project = file.config.project_line();
        file.append_line(&project)?;

        if let Some(fixtures) = file.config.fixtures.clone() {
            file.add_fixtures(&fixtures)?;
        }

        log::info!("Running meson setup ...");
        let output = file
            .tool
            .invoke(&file.config.setup_args, file.dir.path())
            .await
            .map_err(|err| BuildFileError::configuration(err.to_string(), ""))?;
        if !output.success() {
            return Err(BuildFileError::configuration(
                format!("setup exited with {:?}", output.status),
                output.stdout,
            ));
        }
        log::info!("Done!");
        Ok(file)
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn build_file_path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &BuildFileConfig {
        &self.config
    }

    fn build_dir(&self) -> PathBuf {
        self.dir.path().join(&self.config.build_dir)
    }

    fn read_lines(&self) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.path)?;
        Ok(content.split_inclusive('\n').map(str::to_string).collect())
    }

    fn write_lines(&self, lines: &[String]) -> Result<()> {
        fs::write(&self.path, lines.concat())?;
        Ok(())
    }

    fn escape(&self, line: &str) -> String {
        let line = if line.contains(WORKDIR_MARKER) {
            line.replace(WORKDIR_MARKER, &format!("'{}'", self.dir.path().display()))
        } else {
            line.to_string()
        };
        line.replace('\n', "\\n")
    }

    pub fn append_line(&mut self, line: &str) -> Result<()> {
        self.append_lines(&[line])
    }

    /// Append lines; embedded newlines are written as `\n` escapes so each
    /// entry stays a single physical line.
    pub fn append_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<()> {
        let mut content = fs::read_to_string(&self.path)?;
        for line in lines {
            content.push_str(&self.escape(line.as_ref()));
            content.push('\n');
        }
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn remove_line(&mut self, index: usize) -> Result<()> {
        let mut lines = self.read_lines()?;
        if index >= lines.len() {
            return Err(BuildFileError::LineOutOfRange {
                index,
                len: lines.len(),
            });
        }
        lines.remove(index);
        self.write_lines(&lines)
    }

    /// Remove the last `n` lines
    pub fn pop_lines(&mut self, n: usize) -> Result<()> {
        let mut lines = self.read_lines()?;
        if n > lines.len() {
            return Err(BuildFileError::PopTooMany {
                requested: n,
                available: lines.len(),
            });
        }
        lines.truncate(lines.len() - n);
        self.write_lines(&lines)
    }

    pub fn line_count(&self) -> Result<usize> {
        Ok(self.read_lines()?.len())
    }

    /// Line at `index`, without its newline
    pub fn line(&self, index: usize) -> Result<String> {
        let lines = self.read_lines()?;
        let len = lines.len();
        lines
            .into_iter()
            .nth(index)
            .map(|l| l.trim_end_matches('\n').to_string())
            .ok_or(BuildFileError::LineOutOfRange { index, len })
    }

    pub fn content(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    /// Save the current content in the single snapshot slot
    pub fn snapshot(&mut self) -> Result<()> {
        self.snapshot = Some(self.content()?);
        Ok(())
    }

    /// Write the snapshot back, byte for byte
    pub fn restore(&mut self) -> Result<()> {
        let saved = self.snapshot.take().ok_or(BuildFileError::NoSnapshot)?;
        fs::write(&self.path, saved)?;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        fs::write(&self.path, "")?;
        Ok(())
    }

    /// Copy a file or a whole directory into the project root as `name`
    pub fn add_file(&mut self, name: &str, source: &Path) -> Result<()> {
        let dest = self.dir.path().join(name);
        if source.is_dir() {
            copy_dir(source, &dest)
        } else {
            fs::copy(source, &dest)?;
            Ok(())
        }
    }

    /// Copy every entry of `dir` into the project root
    pub fn add_fixtures(&mut self, dir: &Path) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            log::debug!("Adding fixture {name}");
            self.add_file(&name, &entry.path())?;
        }
        Ok(())
    }

    /// Append `lines` plus the sentinel, run the reconfigure step, classify
    /// its output and remove the appended lines again.
    pub async fn probe<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<ProbeOutcome> {
        let lines_before = self.line_count()?;
        let mut candidate: Vec<String> = lines.iter().map(|l| l.as_ref().to_string()).collect();
        candidate.push(sentinel_line());

        self.append_lines(&candidate)?;
        let invoked = self
            .tool
            .invoke(&self.config.reconfigure_args, &self.build_dir())
            .await;
        // The tail goes away on every path, including tool failures.
        self.pop_lines(candidate.len())?;

        let outcome = match invoked {
            Ok(output) => {
                let classification = classify(
                    &output.stdout,
                    &output.stderr,
                    lines_before,
                    self.config.warnings_as_errors,
                );
                ProbeOutcome::from_classification(classification, lines_before, output.stdout, output.stderr)
            }
            Err(BuildFileError::Timeout(limit)) => ProbeOutcome::timed_out(limit),
            Err(err) => return Err(err),
        };
        log::debug!(
            "Probe of {} line(s): {} {:?}",
            lines.len(),
            outcome.kind.as_str(),
            outcome.offset
        );
        Ok(outcome)
    }
}

fn copy_dir(source: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
