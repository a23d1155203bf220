//! Composition of jobs into dependency trees
//!
//! `Node` is the closed set {Job, Series, Parallel}. Every variant implements
//! [`Submit`]: how "wait for these ids" is forwarded and how children are
//! submitted differs per variant.
//!
//! | Variant  | `append_dependency`  | `submit`                                    |
//! |----------|----------------------|---------------------------------------------|
//! | Job      | own hold list        | one scheduler call, then its downstream     |
//! | Series   | first stage only     | stage k, hold stage k+1 on it, then k+1 ... |
//! | Parallel | every child          | every child, independently                  |

use tracing::debug;

use crate::error::{PipeError, Result};
use crate::scheduler::Submitter;

use super::atomic::{DependencyKind, Job};
use super::id::JobId;

/// Shared capability of atomic and composite jobs
pub trait Submit {
    /// Add "wait for" references; duplicates accumulate
    fn append_dependency(&mut self, refs: &[String], kind: DependencyKind);

    /// Submit in dependency order, returning the scheduler identifiers
    fn submit(&mut self, submitter: &mut dyn Submitter) -> Result<Submitted>;
}

/// Identifiers produced by submitting a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Job(JobId),
    /// One entry per child of a `Parallel`, in child order
    Group(Vec<Submitted>),
}

impl Submitted {
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Submitted::Job(id) => Some(id),
            Submitted::Group(_) => None,
        }
    }

    /// Every identifier, nested groups flattened
    pub fn job_ids(&self) -> Vec<&JobId> {
        match self {
            Submitted::Job(id) => vec![id],
            Submitted::Group(items) => items.iter().flat_map(Submitted::job_ids).collect(),
        }
    }

    /// References a successor should hold on
    pub fn dependency_refs(&self) -> Vec<String> {
        self.job_ids().iter().map(|id| id.dependency_ref()).collect()
    }
}

#[derive(Debug)]
pub enum Node {
    Job(Job),
    Series(Series),
    Parallel(Parallel),
}

impl Node {
    pub fn as_job(&self) -> Option<&Job> {
        match self {
            Node::Job(job) => Some(job),
            _ => None,
        }
    }

    /// Every atomic job reachable from this node, downstream edges included
    pub fn jobs(&self) -> Vec<&Job> {
        let mut out = Vec::new();
        self.collect_jobs(&mut out);
        out
    }

    fn collect_jobs<'a>(&'a self, out: &mut Vec<&'a Job>) {
        match self {
            Node::Job(job) => {
                out.push(job);
                for (next, _) in job.downstream() {
                    next.collect_jobs(out);
                }
            }
            Node::Series(series) => series.stages.iter().for_each(|n| n.collect_jobs(out)),
            Node::Parallel(parallel) => parallel.children.iter().for_each(|n| n.collect_jobs(out)),
        }
    }
}

impl From<Job> for Node {
    fn from(job: Job) -> Self {
        Node::Job(job)
    }
}

impl From<Series> for Node {
    fn from(series: Series) -> Self {
        Node::Series(series)
    }
}

impl From<Parallel> for Node {
    fn from(parallel: Parallel) -> Self {
        Node::Parallel(parallel)
    }
}

impl Submit for Node {
    fn append_dependency(&mut self, refs: &[String], kind: DependencyKind) {
        match self {
            Node::Job(job) => job.append_dependency(refs, kind),
            Node::Series(series) => series.append_dependency(refs, kind),
            Node::Parallel(parallel) => parallel.append_dependency(refs, kind),
        }
    }

    fn submit(&mut self, submitter: &mut dyn Submitter) -> Result<Submitted> {
        match self {
            Node::Job(job) => job.submit(submitter),
            Node::Series(series) => series.submit(submitter),
            Node::Parallel(parallel) => parallel.submit(submitter),
        }
    }
}

/// Ordered chain: each stage holds on the one before it
#[derive(Debug)]
pub struct Series {
    stages: Vec<Node>,
    kind: DependencyKind,
}

impl Series {
    pub fn new<N: Into<Node>>(stages: impl IntoIterator<Item = N>) -> Self {
        Self {
            stages: stages.into_iter().map(Into::into).collect(),
            kind: DependencyKind::Ordinary,
        }
    }

    /// Link stages task-by-task (`-hold_jid_ad`) instead of job-by-job
    pub fn as_array(mut self, as_array: bool) -> Self {
        self.kind = DependencyKind::from_array_flag(as_array);
        self
    }

    pub fn stages(&self) -> &[Node] {
        &self.stages
    }
}

impl Submit for Series {
    /// Only the head is gated from outside; later stages wait on their predecessor
    fn append_dependency(&mut self, refs: &[String], kind: DependencyKind) {
        if let Some(head) = self.stages.first_mut() {
            head.append_dependency(refs, kind);
        }
    }

    fn submit(&mut self, submitter: &mut dyn Submitter) -> Result<Submitted> {
        let mut last = None;
        for i in 0..self.stages.len() {
            let submitted = self.stages[i].submit(submitter)?;
            if let Some(next) = self.stages.get_mut(i + 1) {
                let refs = submitted.dependency_refs();
                debug!(stage = i + 1, ?refs, "holding next stage");
                next.append_dependency(&refs, self.kind);
            }
            last = Some(submitted);
        }
        last.ok_or(PipeError::EmptySeries)
    }
}

/// Independent branches sharing the same upstream gate
#[derive(Debug)]
pub struct Parallel {
    children: Vec<Node>,
}

impl Parallel {
    pub fn new<N: Into<Node>>(children: impl IntoIterator<Item = N>) -> Self {
        Self {
            children: children.into_iter().map(Into::into).collect(),
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

impl Submit for Parallel {
    fn append_dependency(&mut self, refs: &[String], kind: DependencyKind) {
        for child in &mut self.children {
            child.append_dependency(refs, kind);
        }
    }

    fn submit(&mut self, submitter: &mut dyn Submitter) -> Result<Submitted> {
        let mut submitted = Vec::with_capacity(self.children.len());
        for child in &mut self.children {
            submitted.push(child.submit(submitter)?);
        }
        Ok(Submitted::Group(submitted))
    }
}
