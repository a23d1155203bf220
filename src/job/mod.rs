//! Jobs and their composition
//!
//! - `atomic`: a single scheduler submission (`Job`, `JobBuilder`)
//! - `array`: a job running a combination sweep through the array runner
//! - `node`: `Series` / `Parallel` composition and the `Submit` protocol
//! - `options`: every `qsub` option and its flag mapping
//! - `id`: scheduler-assigned identifiers

pub mod array;
pub mod atomic;
pub mod id;
pub mod node;
pub mod options;

pub use array::{ArrayJob, RunnerCommand};
pub use atomic::{command_exists, validate_job_name, DependencyKind, Job, JobBuilder};
pub use id::JobId;
pub use node::{Node, Parallel, Series, Submit, Submitted};
pub use options::{JobDefaults, ParallelEnv, QsubOptions};
