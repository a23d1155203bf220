//! Error types with fix suggestions
//!
//! Error code ranges:
//! - PIPE-000-009: Job construction errors
//! - PIPE-010-019: Submission errors
//! - PIPE-020-029: Pipeline file errors
//! - PIPE-030-039: Config / IO errors
//! - PIPE-040-049: Array runner errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipeError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum PipeError {
    // ─────────────────────────────────────────────────────────────
    // Job construction (PIPE-000 to PIPE-009)
    // ─────────────────────────────────────────────────────────────
    #[error("[PIPE-001] Script/Binary not found: {command}")]
    NotFound { command: String },

    #[error("[PIPE-002] Invalid job name (cannot start with a digit): {name}")]
    InvalidName { name: String },

    #[error("[PIPE-003] Array job '{name}' has no argument combinations")]
    EmptySweep { name: String },

    // ─────────────────────────────────────────────────────────────
    // Submission (PIPE-010 to PIPE-019)
    // ─────────────────────────────────────────────────────────────
    #[error("[PIPE-010] Job '{name}' has already been submitted as {job_id}")]
    AlreadySubmitted { name: String, job_id: String },

    #[error("[PIPE-011] Submission of '{name}' failed: {reason}")]
    SubmissionFailed { name: String, reason: String },

    #[error("[PIPE-012] Unparsable job identifier: '{raw}'")]
    InvalidJobId { raw: String },

    #[error("[PIPE-013] Series has no stages")]
    EmptySeries,

    // ─────────────────────────────────────────────────────────────
    // Pipeline files (PIPE-020 to PIPE-029)
    // ─────────────────────────────────────────────────────────────
    #[error("[PIPE-020] Failed to parse pipeline: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("[PIPE-021] Invalid schema: expected '{expected}', got '{actual}'")]
    InvalidSchema { expected: String, actual: String },

    #[error("[PIPE-022] Unknown job '{name}' referenced in run:")]
    UnknownJob { name: String },

    #[error("[PIPE-023] Job '{name}' is used more than once in run:")]
    DuplicateJobUse { name: String },

    #[error("[PIPE-024] Job '{job}': {field} must be a string, number or boolean")]
    NonScalarValue { job: String, field: String },

    // ─────────────────────────────────────────────────────────────
    // Config / IO (PIPE-030 to PIPE-039)
    // ─────────────────────────────────────────────────────────────
    #[error("[PIPE-030] Config error: {reason}")]
    ConfigError { reason: String },

    #[error("[PIPE-031] IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Array runner (PIPE-040 to PIPE-049)
    // ─────────────────────────────────────────────────────────────
    #[error("[PIPE-040] Failed to run '{command}': {reason}")]
    RunnerFailed { command: String, reason: String },

    #[error("[PIPE-041] Invalid array-run arguments: {reason}")]
    InvalidRunnerArgs { reason: String },

    #[error("[PIPE-042] Placeholder {{{index}}} has no value (row has {available})")]
    MissingPlaceholder { index: usize, available: usize },
}

impl PipeError {
    /// Build a submission failure for the named job
    pub fn submission(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SubmissionFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl FixSuggestion for PipeError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            PipeError::NotFound { .. } => {
                Some("Use an existing file path or a command available on PATH")
            }
            PipeError::InvalidName { .. } => {
                Some("Grid Engine job names must not start with a digit; pass a name option")
            }
            PipeError::EmptySweep { .. } => Some("Give every sweep slot at least one value"),
            PipeError::AlreadySubmitted { .. } => {
                Some("Build a new job instead of submitting the same one twice")
            }
            PipeError::SubmissionFailed { .. } => {
                Some("Check that qsub is installed and the job options are accepted")
            }
            PipeError::InvalidJobId { .. } => {
                Some("The scheduler must print '<id>' or '<id>.<range>' (qsub -terse)")
            }
            PipeError::EmptySeries => Some("Add at least one stage to the series"),
            PipeError::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            PipeError::InvalidSchema { .. } => {
                Some("Use 'piperun/pipeline@0.1' as the schema version")
            }
            PipeError::UnknownJob { .. } => Some("Declare the job under jobs: before using it"),
            PipeError::DuplicateJobUse { .. } => {
                Some("Define a second job; each job is submitted exactly once")
            }
            PipeError::NonScalarValue { .. } => {
                Some("Arguments and sweep values cannot be lists or maps")
            }
            PipeError::ConfigError { .. } => Some("Check ~/.config/piperun/config.toml"),
            PipeError::Io(_) => Some("Check file path and permissions"),
            PipeError::RunnerFailed { .. } => Some("Check the command after '--' is runnable"),
            PipeError::InvalidRunnerArgs { .. } => {
                Some("Usage: array-run -1 v1 v2 [-2 w1 w2 ...] -- command {1} {2}")
            }
            PipeError::MissingPlaceholder { .. } => {
                Some("Pass one -N slot for every {N} placeholder in the command")
            }
        }
    }
}
