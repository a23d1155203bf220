//! piperun Configuration
//!
//! Config is stored in `~/.config/piperun/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`PIPERUN_QSUB`, `PIPERUN_MAIL`, `PIPERUN_MAIL_ADDRESS`)
//! 2. Config file (`~/.config/piperun/config.toml`)
//! 3. Defaults
//!
//! ```toml
//! [scheduler]
//! program = "/opt/sge/bin/lx-amd64/qsub"
//!
//! [defaults]
//! mail = "ea"
//! mail_address = ["me@example.org"]
//!
//! [runner]
//! program = "/usr/local/bin/piperun"
//! args = ["array-run"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PipeError, Result};
use crate::job::{JobDefaults, RunnerCommand};

pub const QSUB_ENV: &str = "PIPERUN_QSUB";
pub const MAIL_ENV: &str = "PIPERUN_MAIL";
pub const MAIL_ADDRESS_ENV: &str = "PIPERUN_MAIL_ADDRESS";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PipeConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Mail settings for jobs that do not set their own
    #[serde(default)]
    pub defaults: JobDefaults,

    /// How array tasks start the runner; this executable when unset
    #[serde(default)]
    pub runner: Option<RunnerConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    /// Submission binary, `qsub` when unset
    pub program: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RunnerConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl PipeConfig {
    /// `~/.config/piperun/` on Unix
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("piperun")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from the default location (defaults if the file is absent)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Returns default config if the file doesn't exist, error if malformed
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| PipeError::ConfigError {
            reason: format!("Failed to read config file: {}", e),
        })?;

        toml::from_str(&content).map_err(|e| PipeError::ConfigError {
            reason: format!("Failed to parse config file: {}", e),
        })
    }

    /// Environment variables take precedence over config file values
    pub fn with_env(mut self) -> Self {
        if let Some(program) = non_empty_var(QSUB_ENV) {
            self.scheduler.program = Some(program);
        }
        if let Some(mail) = non_empty_var(MAIL_ENV) {
            self.defaults.mail = mail;
        }
        if let Some(addresses) = non_empty_var(MAIL_ADDRESS_ENV) {
            self.defaults.mail_address = addresses
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect();
        }
        self
    }

    pub fn qsub_program(&self) -> &str {
        self.scheduler.program.as_deref().unwrap_or("qsub")
    }

    pub fn runner_command(&self) -> Result<RunnerCommand> {
        match &self.runner {
            Some(r) => Ok(RunnerCommand::new(r.program.clone(), r.args.clone())),
            None => RunnerCommand::current_exe(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn config_path_contains_piperun() {
        let path = PipeConfig::config_path();
        assert!(path.to_string_lossy().contains("piperun"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = PipeConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, PipeConfig::default());
        assert_eq!(config.qsub_program(), "qsub");
        assert_eq!(config.defaults.mail, "n");
    }

    #[test]
    fn parses_all_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[scheduler]
program = "/opt/sge/bin/qsub"

[defaults]
mail = "ea"
mail_address = ["me@lab"]

[runner]
program = "/usr/local/bin/piperun"
args = ["array-run"]
"#,
        )
        .unwrap();

        let config = PipeConfig::load_from(&path).unwrap();
        assert_eq!(config.qsub_program(), "/opt/sge/bin/qsub");
        assert_eq!(config.defaults.mail, "ea");
        assert_eq!(config.defaults.mail_address, vec!["me@lab"]);
        assert_eq!(
            config.runner_command().unwrap(),
            RunnerCommand::new("/usr/local/bin/piperun", ["array-run"])
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[scheduler\nprogram = ").unwrap();
        assert!(matches!(
            PipeConfig::load_from(&path),
            Err(PipeError::ConfigError { .. })
        ));
    }

    #[test]
    #[serial]
    fn env_overrides_file_values() {
        std::env::set_var(QSUB_ENV, "/usr/bin/fake-qsub");
        std::env::set_var(MAIL_ENV, "b");
        std::env::set_var(MAIL_ADDRESS_ENV, "a@x, b@y,");
        let config = PipeConfig::default().with_env();
        std::env::remove_var(QSUB_ENV);
        std::env::remove_var(MAIL_ENV);
        std::env::remove_var(MAIL_ADDRESS_ENV);

        assert_eq!(config.qsub_program(), "/usr/bin/fake-qsub");
        assert_eq!(config.defaults.mail, "b");
        assert_eq!(config.defaults.mail_address, vec!["a@x", "b@y"]);
    }

    #[test]
    #[serial]
    fn empty_env_values_are_ignored() {
        std::env::set_var(QSUB_ENV, "");
        let config = PipeConfig::default().with_env();
        std::env::remove_var(QSUB_ENV);
        assert_eq!(config.qsub_program(), "qsub");
    }
}
