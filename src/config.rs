//! Configuration handling for codescope.
//!
//! Settings come from an optional `codescope.toml` in the project root, or an
//! explicit path given on the command line. Every field has a default, so an
//! empty or missing file is valid.
//!
//! ```toml
//! [collect]
//! exclude = ["venv", ".git"]
//!
//! [generate]
//! output_dir = "test_analysis/tests"
//!
//! [run]
//! test_command = ["{python}", "-m", "pytest", "{test_dir}", "-v", "--no-header", "-rA"]
//! timeout_secs = 300
//!
//! [report]
//! output_path = "test_analysis/docs/documentation.md"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Name of the project-level configuration file.
pub const CONFIG_FILE_NAME: &str = "codescope.toml";

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Codescope configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub generate: GenerateConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// File collection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CollectConfig {
    /// Directory names skipped while walking the project
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Test generation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Directory receiving the generated test files
    #[serde(default = "default_tests_dir")]
    pub output_dir: PathBuf,
}

/// Test execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Runner command; `{python}` and `{test_dir}` are expanded
    #[serde(default = "default_test_command")]
    pub test_command: Vec<String>,

    /// Kill the runner after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Report settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Path of the Markdown report
    #[serde(default = "default_report_path")]
    pub output_path: PathBuf,
}

fn default_tests_dir() -> PathBuf {
    PathBuf::from("test_analysis").join("tests")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("test_analysis")
        .join("docs")
        .join("documentation.md")
}

/// Default runner invocation. `-rA` adds the `STATUS name` summary lines the
/// result parser reads.
pub fn default_test_command() -> Vec<String> {
    ["{python}", "-m", "pytest", "{test_dir}", "-v", "--no-header", "-rA"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            output_dir: default_tests_dir(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            test_command: default_test_command(),
            timeout_secs: None,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: default_report_path(),
        }
    }
}

impl RunConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `codescope.toml` from the project root, or defaults if absent
    pub fn load_from_project(project_root: &Path) -> Result<Self, ConfigError> {
        let config_path = project_root.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            debug!(path = %config_path.display(), "loading config");
            Self::load(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Excluded directory names as borrowed strings for the collector
    pub fn excludes(&self) -> Vec<&str> {
        self.collect.exclude.iter().map(String::as_str).collect()
    }
}
