use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sigcheck_buildfile::{BuildFileConfig, MesonTool};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_MESON: &str = "SIGCHECK_MESON";
pub const ENV_TIMEOUT_SECS: &str = "SIGCHECK_TIMEOUT_SECS";

/// Checker settings, layered defaults -> TOML file -> environment -> flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Build tool binary
    pub meson: String,

    pub setup_args: Vec<String>,
    pub reconfigure_args: Vec<String>,
    pub build_dir: String,

    pub project_name: String,
    pub languages: Vec<String>,

    /// Treat tool warnings as failures
    pub warnings_as_errors: bool,

    /// Print probed lines and tool output for failures
    pub verbose: bool,

    /// Per-probe limit; unset waits forever
    pub timeout_secs: Option<u64>,

    /// Copied into the project before setup; skipped when missing
    pub fixtures: Option<PathBuf>,

    /// Cap on combinations tried per signature (unset = all)
    pub max_combinations: Option<usize>,

    /// Replacement signature catalog
    pub catalog: Option<PathBuf>,

    /// Replacement template catalog
    pub templates: Option<PathBuf>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        let build = BuildFileConfig::default();
        Self {
            meson: "meson".to_string(),
            setup_args: build.setup_args,
            reconfigure_args: build.reconfigure_args,
            build_dir: build.build_dir,
            project_name: build.project_name,
            languages: build.languages,
            warnings_as_errors: false,
            verbose: false,
            timeout_secs: None,
            fixtures: Some(PathBuf::from("template_files")),
            max_combinations: None,
            catalog: None,
            templates: None,
        }
    }
}

impl CheckerConfig {
    /// Defaults, overlaid with `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `SIGCHECK_*` variables from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(meson) = lookup(ENV_MESON).filter(|v| !v.trim().is_empty()) {
            self.meson = meson;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{ENV_TIMEOUT_SECS} must be a number of seconds, got '{raw}'"))?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.meson.trim().is_empty() {
            return Err("meson program must not be empty".to_string());
        }

        if self.languages.is_empty() {
            return Err("at least one project language is required".to_string());
        }

        if self.build_dir.trim().is_empty() {
            return Err("build_dir must not be empty".to_string());
        }

        if self.timeout_secs == Some(0) {
            return Err("timeout_secs must be > 0".to_string());
        }

        if self.max_combinations == Some(0) {
            return Err("max_combinations must be > 0".to_string());
        }

        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn tool(&self) -> MesonTool {
        MesonTool::new(self.meson.clone()).with_timeout(self.timeout())
    }

    /// Build-file settings; a fixture directory that does not exist is dropped
    pub fn build_file_config(&self) -> BuildFileConfig {
        let fixtures = self.fixtures.clone().filter(|dir| {
            let present = dir.is_dir();
            if !present {
                log::warn!("Fixture directory {} not found, skipping", dir.display());
            }
            present
        });
        BuildFileConfig {
            project_name: self.project_name.clone(),
            languages: self.languages.clone(),
            setup_args: self.setup_args.clone(),
            reconfigure_args: self.reconfigure_args.clone(),
            build_dir: self.build_dir.clone(),
            warnings_as_errors: self.warnings_as_errors,
            fixtures,
        }
    }
}
