//! Pipeline files: YAML description of jobs and how they compose
//!
//! ```yaml
//! schema: piperun/pipeline@0.1
//! defaults:
//!   mail: ea
//!   mail_address: [me@lab.org]
//! jobs:
//!   align:
//!     command: ./align.sh
//!     args: ["{1}", "{2}"]
//!     options: { mem: 4G, queue: [long.q] }
//!     sweep:
//!       mode: product
//!       slots:
//!         1: [s1.fq, s2.fq]
//!         2: [hg38, mm10]
//!   merge:
//!     command: ./merge.sh
//! run:
//!   series:
//!     - align
//!     - merge
//! ```
//!
//! `run` is a tree: a job name, `{series: [...], as_array: bool}` or
//! `{parallel: [...]}`. Each job is used at most once.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::config::PipeConfig;
use crate::error::{PipeError, Result};
use crate::job::{ArrayJob, Job, JobDefaults, Node, Parallel, QsubOptions, RunnerCommand, Series};
use crate::sweep::{CombinationSet, SweepMode};

pub const SCHEMA: &str = "piperun/pipeline@0.1";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pipeline {
    pub schema: String,
    /// Overrides the config file's mail defaults
    #[serde(default)]
    pub defaults: Option<JobDefaults>,
    pub jobs: BTreeMap<String, JobSpec>,
    pub run: NodeSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub options: QsubOptions,
    /// Present: submit as an array job over the combinations
    #[serde(default)]
    pub sweep: Option<SweepSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSpec {
    #[serde(default)]
    pub mode: SweepMode,
    pub slots: BTreeMap<usize, Vec<Value>>,
}

/// Composition tree; serde picks the variant from the shape
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Job(String),
    Series(SeriesSpec),
    Parallel(ParallelSpec),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeriesSpec {
    pub series: Vec<NodeSpec>,
    #[serde(default)]
    pub as_array: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParallelSpec {
    pub parallel: Vec<NodeSpec>,
}

impl Pipeline {
    pub fn from_yaml(source: &str) -> Result<Self> {
        let pipeline: Pipeline = serde_yaml::from_str(source)?;
        pipeline.validate_schema()?;
        Ok(pipeline)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    fn validate_schema(&self) -> Result<()> {
        if self.schema != SCHEMA {
            return Err(PipeError::InvalidSchema {
                expected: SCHEMA.to_string(),
                actual: self.schema.clone(),
            });
        }
        Ok(())
    }

    /// Build the `run` tree into unsubmitted nodes
    pub fn build(&self, config: &PipeConfig) -> Result<Node> {
        let mut builder = TreeBuilder {
            jobs: &self.jobs,
            defaults: self.defaults.clone().unwrap_or_else(|| config.defaults.clone()),
            config,
            runner: None,
            used: HashSet::new(),
        };
        let node = builder.node(&self.run)?;

        for name in self.jobs.keys() {
            if !builder.used.contains(name.as_str()) {
                warn!(job = %name, "Job is defined but never used in run:");
            }
        }
        Ok(node)
    }
}

struct TreeBuilder<'a> {
    jobs: &'a BTreeMap<String, JobSpec>,
    defaults: JobDefaults,
    config: &'a PipeConfig,
    runner: Option<RunnerCommand>,
    used: HashSet<&'a str>,
}

impl<'a> TreeBuilder<'a> {
    fn node(&mut self, spec: &'a NodeSpec) -> Result<Node> {
        match spec {
            NodeSpec::Job(name) => self.job(name).map(Node::from),
            NodeSpec::Series(SeriesSpec { series, as_array }) => {
                let stages = series
                    .iter()
                    .map(|s| self.node(s))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Series::new(stages).as_array(*as_array).into())
            }
            NodeSpec::Parallel(ParallelSpec { parallel }) => {
                let children = parallel
                    .iter()
                    .map(|s| self.node(s))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Parallel::new(children).into())
            }
        }
    }

    fn job(&mut self, name: &'a str) -> Result<Job> {
        let spec = self.jobs.get(name).ok_or_else(|| PipeError::UnknownJob {
            name: name.to_string(),
        })?;
        if !self.used.insert(name) {
            return Err(PipeError::DuplicateJobUse {
                name: name.to_string(),
            });
        }

        let args = spec
            .args
            .iter()
            .enumerate()
            .map(|(i, v)| scalar(v).ok_or_else(|| non_scalar(name, format!("args[{}]", i))))
            .collect::<Result<Vec<_>>>()?;

        let mut options = spec.options.clone();
        if options.name.is_none() {
            options.name = Some(name.to_string());
        }
        debug!(job = name, command = %spec.command, "Building job");

        match &spec.sweep {
            None => Job::builder(&spec.command)
                .args(args)
                .options(options)
                .defaults(self.defaults.clone())
                .build(),
            Some(sweep) => {
                let combinations = sweep_set(name, sweep)?;
                let runner = self.runner()?;
                ArrayJob::new(&spec.command, combinations)
                    .args(args)
                    .options(options)
                    .defaults(self.defaults.clone())
                    .runner(runner)
                    .build()
            }
        }
    }

    /// Resolved once, only when the pipeline has an array job
    fn runner(&mut self) -> Result<RunnerCommand> {
        if let Some(runner) = &self.runner {
            return Ok(runner.clone());
        }
        let runner = self.config.runner_command()?;
        self.runner = Some(runner.clone());
        Ok(runner)
    }
}

fn sweep_set(job: &str, sweep: &SweepSpec) -> Result<CombinationSet<String>> {
    let mut slots = BTreeMap::new();
    for (slot, values) in &sweep.slots {
        let values = values
            .iter()
            .map(|v| scalar(v).ok_or_else(|| non_scalar(job, format!("sweep slot {}", slot))))
            .collect::<Result<Vec<_>>>()?;
        slots.insert(*slot, values);
    }
    Ok(CombinationSet::from_slots(slots, sweep.mode))
}

/// YAML scalars as command-line text (`5`, `0.5`, `true`)
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_scalar(job: &str, field: String) -> PipeError {
    PipeError::NonScalarValue {
        job: job.to_string(),
        field,
    }
}
