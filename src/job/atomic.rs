//! Atomic jobs - one scheduler submission each
//!
//! A `Job` owns its command line, its hold lists and the successors it
//! triggers once its own identifier is known. Identity is assigned exactly
//! once by [`Submit::submit`]; a second submission fails.

use std::path::Path;

use colored::Colorize;
use tracing::{debug, info, instrument};

use crate::error::{PipeError, Result};
use crate::scheduler::Submitter;

use super::id::JobId;
use super::node::{Node, Submit, Submitted};
use super::options::{JobDefaults, QsubOptions};

/// Granularity of a "wait for" reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyKind {
    /// Wait for the whole predecessor job (`-hold_jid`)
    #[default]
    Ordinary,
    /// Wait for the matching task of a predecessor array job (`-hold_jid_ad`)
    ArrayKeyed,
}

impl DependencyKind {
    pub fn from_array_flag(as_array: bool) -> Self {
        if as_array {
            DependencyKind::ArrayKeyed
        } else {
            DependencyKind::Ordinary
        }
    }
}

/// Successor submitted right after this job, holding on its id
#[derive(Debug)]
struct Downstream {
    node: Node,
    kind: DependencyKind,
}

#[derive(Debug)]
pub struct Job {
    command: String,
    args: Vec<String>,
    options: QsubOptions,
    job_id: Option<JobId>,
    downstream: Vec<Downstream>,
}

impl Job {
    /// Build a job with default mail settings
    pub fn new(
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        options: QsubOptions,
    ) -> Result<Self> {
        JobBuilder::new(command).args(args).options(options).build()
    }

    pub fn builder(command: impl Into<String>) -> JobBuilder {
        JobBuilder::new(command)
    }

    pub fn name(&self) -> &str {
        self.options.name.as_deref().unwrap_or_default()
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn options(&self) -> &QsubOptions {
        &self.options
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn is_submitted(&self) -> bool {
        self.job_id.is_some()
    }

    /// Current hold list of the given kind
    pub fn dependencies(&self, kind: DependencyKind) -> &[String] {
        match kind {
            DependencyKind::Ordinary => &self.options.hold_jid,
            DependencyKind::ArrayKeyed => &self.options.hold_jid_ad,
        }
    }

    /// Trigger `node` once this job is submitted, holding on this job's id
    pub fn append_downstream(&mut self, node: impl Into<Node>, as_array: bool) {
        self.downstream.push(Downstream {
            node: node.into(),
            kind: DependencyKind::from_array_flag(as_array),
        });
    }

    /// Successors recorded with [`Job::append_downstream`]
    pub fn downstream(&self) -> impl Iterator<Item = (&Node, DependencyKind)> {
        self.downstream.iter().map(|d| (&d.node, d.kind))
    }

    /// Scheduler argv for this job
    pub fn command_line(&self, program: &str) -> Vec<String> {
        self.options.to_argv(program, &self.command, &self.args)
    }

    /// `name\t-> id [ SUBMITTED ] (waiting a,b)`, once submitted
    pub fn status_line(&self) -> Option<String> {
        let id = self.job_id.as_ref()?;
        let holds: Vec<&str> = self
            .options
            .hold_jid
            .iter()
            .chain(&self.options.hold_jid_ad)
            .map(String::as_str)
            .collect();
        let waiting = if holds.is_empty() {
            String::new()
        } else {
            format!(" (waiting {})", holds.join(","))
        };
        Some(format!(
            "{}\t-> {} {}{}",
            self.name(),
            id.to_string().bold(),
            "[ SUBMITTED ]".green(),
            waiting
        ))
    }
}

impl Submit for Job {
    fn append_dependency(&mut self, refs: &[String], kind: DependencyKind) {
        let holds = match kind {
            DependencyKind::Ordinary => &mut self.options.hold_jid,
            DependencyKind::ArrayKeyed => &mut self.options.hold_jid_ad,
        };
        holds.extend(refs.iter().cloned());
    }

    #[instrument(skip(self, submitter), fields(job = %self.name()))]
    fn submit(&mut self, submitter: &mut dyn Submitter) -> Result<Submitted> {
        if let Some(id) = &self.job_id {
            return Err(PipeError::AlreadySubmitted {
                name: self.name().to_string(),
                job_id: id.to_string(),
            });
        }

        let argv = self.command_line(submitter.program());
        debug!(?argv, "submitting");

        let stdout = submitter
            .submit(&argv)
            .map_err(|e| PipeError::submission(self.name(), e.to_string()))?;
        let id: JobId = stdout
            .parse()
            .map_err(|e: PipeError| PipeError::submission(self.name(), e.to_string()))?;

        self.job_id = Some(id.clone());
        info!(job_id = %id, "submitted");
        if let Some(line) = self.status_line() {
            println!("{}", line);
        }

        let refs = [id.dependency_ref()];
        for next in &mut self.downstream {
            next.node.append_dependency(&refs, next.kind);
            next.node.submit(submitter)?;
        }

        Ok(Submitted::Job(id))
    }
}

/// Builder for [`Job`]
#[derive(Debug, Clone)]
pub struct JobBuilder {
    command: String,
    args: Vec<String>,
    options: QsubOptions,
    defaults: JobDefaults,
}

impl JobBuilder {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            options: QsubOptions::default(),
            defaults: JobDefaults::default(),
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replace the options; a name set earlier survives unless `options` has one
    pub fn options(mut self, options: QsubOptions) -> Self {
        let name = self.options.name.take();
        self.options = options;
        if self.options.name.is_none() {
            self.options.name = name;
        }
        self
    }

    /// Explicit job name (`-N`); defaults to the command's file name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    pub fn defaults(mut self, defaults: JobDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn build(self) -> Result<Job> {
        let JobBuilder {
            command,
            args,
            mut options,
            defaults,
        } = self;

        if !command_exists(&command) {
            return Err(PipeError::NotFound { command });
        }

        let name = options
            .name
            .take()
            .unwrap_or_else(|| default_name(&command));
        validate_job_name(&name)?;
        options.name = Some(name);
        options.normalize(&defaults);

        Ok(Job {
            command,
            args,
            options,
            job_id: None,
            downstream: Vec::new(),
        })
    }
}

/// Grid Engine rejects job names starting with a digit
pub fn validate_job_name(name: &str) -> Result<()> {
    match name.chars().next() {
        Some(c) if c.is_ascii_digit() => Err(PipeError::InvalidName {
            name: name.to_string(),
        }),
        _ => Ok(()),
    }
}

pub(crate) fn default_name(command: &str) -> String {
    Path::new(command)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| command.to_string())
}

/// True if `command` is an existing file or is found on `PATH`
pub fn command_exists(command: &str) -> bool {
    if command.is_empty() {
        return false;
    }
    if Path::new(command).is_file() {
        return true;
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(command).exists()))
        .unwrap_or(false)
}
