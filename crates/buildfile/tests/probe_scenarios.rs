use async_trait::async_trait;
use pretty_assertions::assert_eq;
use sigcheck_buildfile::{
    BuildFileConfig, BuildFileError, BuildTool, DiagnosticKind, Result, ToolOutput,
    TransactionalBuildFile, IGNORE_MARKER,
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Script = dyn Fn(&[String], &str) -> Result<ToolOutput> + Send + Sync;

/// Stands in for meson: reads the build file the real tool would read and
/// answers through a closure. Every invocation's file content is recorded.
struct ScriptedTool {
    script: Box<Script>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTool {
    fn new(
        script: impl Fn(&[String], &str) -> Result<ToolOutput> + Send + Sync + 'static,
    ) -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tool = Self {
            script: Box::new(script),
            seen: Arc::clone(&seen),
        };
        (tool, seen)
    }
}

#[async_trait]
impl BuildTool for ScriptedTool {
    async fn invoke(&self, args: &[String], cwd: &Path) -> Result<ToolOutput> {
        let project_dir = if args.iter().any(|a| a == "--reconfigure") {
            cwd.parent().unwrap_or(cwd)
        } else {
            cwd
        };
        let content = fs::read_to_string(project_dir.join("meson.build"))?;
        self.seen.lock().unwrap().push(content.clone());
        (self.script)(args, &content)
    }
}

/// Accepts everything except string values for `install`, and stops at the
/// sentinel the way meson stops at the first `error()`.
fn mini_meson(args: &[String], content: &str) -> Result<ToolOutput> {
    if args.first().map(String::as_str) == Some("setup") {
        return Ok(ToolOutput {
            status: Some(0),
            stdout: "The Meson build system\nBuild targets in project: 0\n".to_string(),
            stderr: String::new(),
        });
    }
    let mut stdout = String::from("The Meson build system\nProject name: generated\n");
    for (idx, line) in content.lines().enumerate() {
        let number = idx + 1;
        if line.contains("install : 'yes'") {
            stdout.push_str(&format!(
                "../meson.build:{number}:0: ERROR: executable keyword argument 'install' was of type str but should have been bool\n"
            ));
            return Ok(ToolOutput { status: Some(1), stdout, stderr: String::new() });
        }
        if line.starts_with("error(") {
            stdout.push_str(&format!(
                "../meson.build:{number}:0: ERROR: Problem encountered: This error is produced to speed up checks and can be ignored ({IGNORE_MARKER})\n"
            ));
            return Ok(ToolOutput { status: Some(1), stdout, stderr: String::new() });
        }
    }
    Ok(ToolOutput { status: Some(0), stdout, stderr: String::new() })
}

async fn project_with(tool: ScriptedTool) -> TransactionalBuildFile {
    TransactionalBuildFile::create(BuildFileConfig::default(), Box::new(tool))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_writes_project_line() {
    let (tool, seen) = ScriptedTool::new(mini_meson);
    let file = project_with(tool).await;
    assert_eq!(file.content().unwrap(), "project('generated', ['c', 'java'])\n");
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert!(file.build_file_path().starts_with(file.dir()));
}

#[tokio::test]
async fn test_failed_setup_is_configuration_error() {
    let (tool, _) = ScriptedTool::new(|_, _| {
        Ok(ToolOutput {
            status: Some(1),
            stdout: "ERROR: Unknown compiler(s): [['javac']]\n".to_string(),
            stderr: String::new(),
        })
    });
    let err = TransactionalBuildFile::create(BuildFileConfig::default(), Box::new(tool))
        .await
        .unwrap_err();
    match err {
        BuildFileError::Configuration { stdout, .. } => assert!(stdout.contains("javac")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_well_typed_call_is_not_found() {
    let (tool, _) = ScriptedTool::new(mini_meson);
    let mut file = project_with(tool).await;
    let outcome = file
        .probe(&["ret = executable('exe', 'foo.c', install : true)"])
        .await
        .unwrap();
    assert!(outcome.passed());
    assert_eq!(outcome.offset, None);
    assert_eq!(outcome.message, "");
    assert_eq!(outcome.kind, DiagnosticKind::Clean);
}

#[tokio::test]
async fn test_wrong_argument_type_points_at_injected_line() {
    let (tool, _) = ScriptedTool::new(mini_meson);
    let mut file = project_with(tool).await;
    let outcome = file
        .probe(&["ret = executable('exe', 'foo.c', install : 'yes')"])
        .await
        .unwrap();
    assert_eq!(outcome.offset, Some(0));
    assert_eq!(outcome.kind, DiagnosticKind::Error);
    assert!(outcome.message.contains("'install' was of type str"));
}

#[tokio::test]
async fn test_offset_is_relative_to_first_candidate_line() {
    let (tool, _) = ScriptedTool::new(mini_meson);
    let mut file = project_with(tool).await;
    file.append_lines(&["a = 1", "b = 2"]).unwrap();
    let outcome = file
        .probe(&[
            "x = 'foo.c'",
            "y = executable('exe', x)",
            "z = executable('exe2', x, install : 'yes')",
        ])
        .await
        .unwrap();
    assert_eq!(outcome.offset, Some(2));
}

#[tokio::test]
async fn test_stderr_is_a_crash_whatever_stdout_says() {
    let (tool, _) = ScriptedTool::new(|args, content| {
        let mut out = mini_meson(args, content)?;
        if args.first().map(String::as_str) != Some("setup") {
            out.stderr = "Traceback (most recent call last):\n  File \"mesonmain.py\"\n".to_string();
        }
        Ok(out)
    });
    let mut file = project_with(tool).await;
    let outcome = file.probe(&["x = 1"]).await.unwrap();
    assert_eq!(outcome.kind, DiagnosticKind::Crash);
    assert_eq!(outcome.offset, Some(0));
    assert_eq!(outcome.message, "Meson has crashed");
    assert!(outcome.stderr.contains("Traceback"));
}

#[tokio::test]
async fn test_probe_restores_content_exactly() {
    let (tool, seen) = ScriptedTool::new(mini_meson);
    let mut file = project_with(tool).await;
    file.append_line("keep = 'me'").unwrap();
    let before = file.content().unwrap();
    let count = file.line_count().unwrap();

    for lines in [
        vec!["ok = 1"],
        vec!["bad = executable('e', 'foo.c', install : 'yes')", "more = 2"],
        vec![],
    ] {
        file.probe(lines.as_slice()).await.unwrap();
        assert_eq!(file.line_count().unwrap(), count);
        assert_eq!(file.content().unwrap(), before);
    }

    let seen = seen.lock().unwrap();
    let last = seen.last().unwrap();
    assert!(last.starts_with(&before));
    assert!(last.trim_end().ends_with(&format!("({IGNORE_MARKER})')")));
}

#[tokio::test]
async fn test_tool_failure_still_rolls_back() {
    let (tool, _) = ScriptedTool::new(|args, content| {
        if args.first().map(String::as_str) == Some("setup") {
            return mini_meson(args, content);
        }
        Err(BuildFileError::Launch {
            program: "meson".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        })
    });
    let mut file = project_with(tool).await;
    let before = file.content().unwrap();
    assert!(file.probe(&["x = 1"]).await.is_err());
    assert_eq!(file.content().unwrap(), before);
}

#[tokio::test]
async fn test_timeout_is_a_failing_probe() {
    let (tool, _) = ScriptedTool::new(|args, content| {
        if args.first().map(String::as_str) == Some("setup") {
            return mini_meson(args, content);
        }
        Err(BuildFileError::Timeout(Duration::from_secs(3)))
    });
    let mut file = project_with(tool).await;
    let before = file.content().unwrap();
    let outcome = file.probe(&["x = 1"]).await.unwrap();
    assert_eq!(outcome.kind, DiagnosticKind::Timeout);
    assert_eq!(outcome.offset, Some(0));
    assert_eq!(file.content().unwrap(), before);
}

#[tokio::test]
async fn test_snapshot_and_restore_are_byte_exact() {
    let (tool, _) = ScriptedTool::new(mini_meson);
    let mut file = project_with(tool).await;
    file.append_lines(&["a = 'x'", "b = [1, 2]"]).unwrap();
    let before = file.content().unwrap();

    file.snapshot().unwrap();
    file.clear().unwrap();
    assert_eq!(file.line_count().unwrap(), 0);
    file.append_line("project('generated')").unwrap();
    file.restore().unwrap();
    assert_eq!(file.content().unwrap(), before);

    assert!(matches!(file.restore(), Err(BuildFileError::NoSnapshot)));
}

#[tokio::test]
async fn test_line_editing() {
    let (tool, _) = ScriptedTool::new(mini_meson);
    let mut file = project_with(tool).await;
    file.append_lines(&["a = 1", "b = 2", "c = 3"]).unwrap();
    assert_eq!(file.line(2).unwrap(), "b = 2");

    file.remove_line(2).unwrap();
    assert_eq!(file.line(2).unwrap(), "c = 3");
    assert!(matches!(
        file.remove_line(10),
        Err(BuildFileError::LineOutOfRange { index: 10, len: 3 })
    ));

    file.pop_lines(2).unwrap();
    assert_eq!(file.line_count().unwrap(), 1);
    assert!(matches!(
        file.pop_lines(5),
        Err(BuildFileError::PopTooMany { requested: 5, available: 1 })
    ));
}

#[tokio::test]
async fn test_newlines_escaped_and_workdir_expanded() {
    let (tool, _) = ScriptedTool::new(mini_meson);
    let mut file = project_with(tool).await;
    file.append_line("s = 'one\ntwo'").unwrap();
    assert_eq!(file.line_count().unwrap(), 2);
    assert_eq!(file.line(1).unwrap(), "s = 'one\\ntwo'");

    file.append_line("d = $BUILDFILE_DIR$").unwrap();
    let expected = format!("d = '{}'", file.dir().display());
    assert_eq!(file.line(2).unwrap(), expected);
}

#[tokio::test]
async fn test_fixtures_copied_before_setup() {
    let fixtures = tempfile::tempdir().unwrap();
    fs::write(fixtures.path().join("foo.c"), "int main(void) { return 0; }\n").unwrap();
    fs::create_dir_all(fixtures.path().join("subdir")).unwrap();
    fs::write(fixtures.path().join("subdir/meson.build"), "x = 1\n").unwrap();

    let (tool, _) = ScriptedTool::new(mini_meson);
    let config = BuildFileConfig {
        fixtures: Some(fixtures.path().to_path_buf()),
        ..BuildFileConfig::default()
    };
    let file = TransactionalBuildFile::create(config, Box::new(tool)).await.unwrap();
    assert!(file.dir().join("foo.c").is_file());
    assert_eq!(
        fs::read_to_string(file.dir().join("subdir/meson.build")).unwrap(),
        "x = 1\n"
    );
}
