//! piperun - compose Grid Engine jobs into dependency pipelines
//!
//! - `job`: atomic jobs, `Series` / `Parallel` composition, array jobs
//! - `sweep`: argument combinations and per-task partitioning
//! - `scheduler`: where command lines are sent (`qsub` or a dry run)
//! - `pipeline`: YAML pipeline files
//! - `runner`: the `array-run` side executed inside each array task

pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod runner;
pub mod scheduler;
pub mod sweep;

pub use config::PipeConfig;
pub use error::{FixSuggestion, PipeError, Result};
pub use job::{
    ArrayJob, DependencyKind, Job, JobBuilder, JobDefaults, JobId, Node, Parallel, QsubOptions,
    RunnerCommand, Series, Submit, Submitted,
};
pub use pipeline::Pipeline;
pub use runner::ArrayRun;
pub use scheduler::{DryRunSubmitter, QsubSubmitter, Submitter};
pub use sweep::{CombinationSet, PartitionIndex, SweepMode};
