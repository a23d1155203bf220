//! Scheduler backends - where a job's command line is sent
//!
//! `QsubSubmitter` runs the real scheduler binary and blocks until it exits.
//! `DryRunSubmitter` records every command line and hands out ids the way
//! `qsub -terse` would print them.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Failure reported by a scheduler backend
#[derive(Error, Debug)]
pub enum SubmitFailure {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{0}")]
    Rejected(String),
}

/// External collaborator that accepts a command line and returns the
/// scheduler's textual job identifier
pub trait Submitter {
    /// Binary placed at `argv[0]`
    fn program(&self) -> &str;

    /// Submit `argv` and return the scheduler's stdout
    fn submit(&mut self, argv: &[String]) -> Result<String, SubmitFailure>;
}

/// Runs `qsub` (or a configured replacement) as a child process
#[derive(Debug, Clone)]
pub struct QsubSubmitter {
    program: String,
}

impl QsubSubmitter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for QsubSubmitter {
    fn default() -> Self {
        Self::new("qsub")
    }
}

impl Submitter for QsubSubmitter {
    fn program(&self) -> &str {
        &self.program
    }

    fn submit(&mut self, argv: &[String]) -> Result<String, SubmitFailure> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SubmitFailure::Rejected("empty command line".to_string()))?;

        debug!(?argv, "running scheduler");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| SubmitFailure::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SubmitFailure::Exit {
                program: program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Records submissions without contacting a scheduler
#[derive(Debug, Clone)]
pub struct DryRunSubmitter {
    next_id: u64,
    calls: Vec<Vec<String>>,
}

impl DryRunSubmitter {
    /// First id handed out is `first_id`, then sequential
    pub fn new(first_id: u64) -> Self {
        Self {
            next_id: first_id,
            calls: Vec::new(),
        }
    }

    /// Every submitted argv, in submission order
    pub fn calls(&self) -> &[Vec<String>] {
        &self.calls
    }
}

impl Default for DryRunSubmitter {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Submitter for DryRunSubmitter {
    fn program(&self) -> &str {
        "qsub"
    }

    fn submit(&mut self, argv: &[String]) -> Result<String, SubmitFailure> {
        let id = self.next_id;
        self.next_id += 1;
        self.calls.push(argv.to_vec());

        // -terse prints `<id>.<range>:<step>` for array jobs. `-t` is a value
        // flag, emitted before `-terse`; later tokens belong to the command.
        let options = argv
            .iter()
            .position(|a| a == "-terse")
            .map_or(argv, |end| &argv[..end]);
        let range = options
            .iter()
            .position(|a| a == "-t")
            .and_then(|i| options.get(i + 1));
        Ok(match range {
            Some(r) if r.contains(':') => format!("{}.{}", id, r),
            Some(r) => format!("{}.{}:1", id, r),
            None => id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dry_run_hands_out_sequential_ids() {
        let mut dry = DryRunSubmitter::new(100);
        assert_eq!(dry.submit(&argv(&["qsub", "a"])).unwrap(), "100");
        assert_eq!(dry.submit(&argv(&["qsub", "b"])).unwrap(), "101");
        assert_eq!(dry.calls().len(), 2);
        assert_eq!(dry.calls()[1], argv(&["qsub", "b"]));
    }

    #[test]
    fn dry_run_reports_array_ranges() {
        let mut dry = DryRunSubmitter::default();
        assert_eq!(
            dry.submit(&argv(&["qsub", "-t", "1-3", "cmd"])).unwrap(),
            "1.1-3:1"
        );
        assert_eq!(
            dry.submit(&argv(&["qsub", "-t", "1-9:2", "cmd"])).unwrap(),
            "2.1-9:2"
        );
    }

    #[cfg(unix)]
    #[test]
    fn dry_run_ignores_command_arguments() {
        let mut dry = DryRunSubmitter::new(7);
        assert_eq!(
            dry.submit(&argv(&["qsub", "-N", "s", "-terse", "sort", "-t", ",", "f"]))
                .unwrap(),
            "7"
        );
        assert_eq!(
            dry.submit(&argv(&["qsub", "-t", "1-4", "-terse", "sort", "-t", ","]))
                .unwrap(),
            "8.1-4:1"
        );
    }

    #[test]
    fn qsub_submitter_returns_trimmed_stdout() {
        let mut submitter = QsubSubmitter::new("echo");
        let out = submitter.submit(&argv(&["echo", "4242"])).unwrap();
        assert_eq!(out, "4242");
    }

    #[cfg(unix)]
    #[test]
    fn qsub_submitter_propagates_non_zero_exit() {
        let mut submitter = QsubSubmitter::new("false");
        let err = submitter.submit(&argv(&["false"])).unwrap_err();
        assert!(matches!(err, SubmitFailure::Exit { .. }));
    }

    #[test]
    fn qsub_submitter_reports_missing_binary() {
        let mut submitter = QsubSubmitter::new("piperun-no-such-qsub");
        let err = submitter
            .submit(&argv(&["piperun-no-such-qsub", "x"]))
            .unwrap_err();
        assert!(matches!(err, SubmitFailure::Spawn { .. }));
    }
}
