//! Array jobs - one scheduler submission running a combination sweep
//!
//! The submitted command is the array runner (`piperun array-run`), which
//! receives every sweep column as `-1 =v… -2 =v…`, the user command after
//! `--`, and picks its own rows at run time from the task index. Columns are
//! fully expanded here, so the runner always zips them back into rows.
//!
//! Each value carries a leading `=` so that values such as `-2` or `--`
//! cannot be read back as slot markers.

use std::path::PathBuf;

use crate::error::{PipeError, Result};
use crate::sweep::CombinationSet;

use super::atomic::{command_exists, default_name, Job, JobBuilder};
use super::options::{JobDefaults, QsubOptions};

/// Environment variables exported to every array task
const EXPORTED_VARS: [&str; 2] = ["PATH", "LD_LIBRARY_PATH"];

/// How the scheduler should start the array runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl RunnerCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// This executable's `array-run` subcommand
    pub fn current_exe() -> Result<Self> {
        let exe: PathBuf = std::env::current_exe()?;
        Ok(Self::new(exe.to_string_lossy(), ["array-run"]))
    }
}

/// Builder turning a command plus a [`CombinationSet`] into an array [`Job`]
#[derive(Debug, Clone)]
pub struct ArrayJob {
    command: String,
    args: Vec<String>,
    sweep: CombinationSet<String>,
    options: QsubOptions,
    defaults: JobDefaults,
    runner: Option<RunnerCommand>,
}

impl ArrayJob {
    pub fn new(command: impl Into<String>, sweep: CombinationSet<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            sweep,
            options: QsubOptions::default(),
            defaults: JobDefaults::default(),
            runner: None,
        }
    }

    /// Argument template; `{N}` is replaced by the row's N-th value
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn options(mut self, options: QsubOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    pub fn defaults(mut self, defaults: JobDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Defaults to [`RunnerCommand::current_exe`]
    pub fn runner(mut self, runner: RunnerCommand) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn build(self) -> Result<Job> {
        let ArrayJob {
            command,
            args,
            sweep,
            mut options,
            defaults,
            runner,
        } = self;

        if !command_exists(&command) {
            return Err(PipeError::NotFound { command });
        }

        let rows = sweep.build();
        if rows.is_empty() {
            return Err(PipeError::EmptySweep {
                name: options.name.clone().unwrap_or_else(|| command.clone()),
            });
        }

        if options.name.is_none() {
            options.name = Some(default_name(&command));
        }
        options.cwd = true;
        options.binary = Some(true);
        if options.array.is_none() {
            options.array = Some(format!("1-{}", rows.len()));
        }
        for var in EXPORTED_VARS {
            options
                .var
                .insert(var.to_string(), std::env::var(var).unwrap_or_default());
        }

        let runner = match runner {
            Some(r) => r,
            None => RunnerCommand::current_exe()?,
        };

        let mut runner_args = runner.args;
        for (position, column) in columns(&rows).into_iter().enumerate() {
            runner_args.push(format!("-{}", position + 1));
            runner_args.extend(column.into_iter().map(|v| quote(&format!("={}", v))));
        }
        runner_args.push("--".to_string());
        runner_args.push(command);
        runner_args.extend(args.iter().map(|a| quote(a)));

        JobBuilder::new(runner.program)
            .args(runner_args)
            .options(options)
            .defaults(defaults)
            .build()
    }
}

/// Transpose rows back into per-slot columns
fn columns(rows: &[Vec<String>]) -> Vec<Vec<&str>> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    (0..width)
        .map(|slot| rows.iter().map(|row| row[slot].as_str()).collect())
        .collect()
}

/// Double-quote for the scheduler's shell, escaping `\` and `"`
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ArrayRun;
    use crate::sweep::SweepMode;
    use pretty_assertions::assert_eq;

    fn runner() -> RunnerCommand {
        RunnerCommand::new("sh", ["piperun", "array-run"])
    }

    fn files() -> CombinationSet<String> {
        CombinationSet::new(SweepMode::Zip).slot(
            1,
            ["piperunner.py", "arrayrunner.py", "qsubparse.py"].map(String::from),
        )
    }

    #[test]
    fn wraps_command_in_runner() {
        let job = ArrayJob::new("grep", files())
            .args(["^\\s*def", "{1}"])
            .runner(runner())
            .build()
            .unwrap();

        assert_eq!(job.command(), "sh");
        assert_eq!(job.name(), "grep");
        assert_eq!(
            job.args(),
            &[
                "piperun",
                "array-run",
                "-1",
                "\"=piperunner.py\"",
                "\"=arrayrunner.py\"",
                "\"=qsubparse.py\"",
                "--",
                "grep",
                "\"^\\\\s*def\"",
                "\"{1}\"",
            ]
        );
    }

    #[test]
    fn forces_array_settings() {
        let job = ArrayJob::new("grep", files()).runner(runner()).build().unwrap();
        let options = job.options();
        assert_eq!(options.array.as_deref(), Some("1-3"));
        assert!(options.cwd);
        assert_eq!(options.binary, Some(true));
        assert!(options.var.contains_key("PATH"));
        assert!(options.var.contains_key("LD_LIBRARY_PATH"));
    }

    #[test]
    fn explicit_range_is_kept() {
        let options = QsubOptions {
            array: Some("1-3:3".into()),
            ..Default::default()
        };
        let job = ArrayJob::new("grep", files())
            .options(options)
            .runner(runner())
            .build()
            .unwrap();
        assert_eq!(job.options().array.as_deref(), Some("1-3:3"));
    }

    #[test]
    fn product_sweep_is_expanded_before_submission() {
        let sweep = CombinationSet::new(SweepMode::Product)
            .slot(1, ["a", "b"].map(String::from))
            .slot(2, ["x", "y"].map(String::from));
        let job = ArrayJob::new("echo", sweep).runner(runner()).build().unwrap();

        assert_eq!(job.options().array.as_deref(), Some("1-4"));
        let args = job.args();
        let two = args.iter().position(|a| a == "-2").unwrap();
        assert_eq!(&args[3..two], &["\"=a\"", "\"=a\"", "\"=b\"", "\"=b\""]);
        assert_eq!(
            &args[two + 1..two + 5],
            &["\"=x\"", "\"=y\"", "\"=x\"", "\"=y\""]
        );
    }

    #[test]
    fn empty_sweep_is_rejected() {
        let err = ArrayJob::new("echo", CombinationSet::new(SweepMode::Zip))
            .runner(runner())
            .build()
            .unwrap_err();
        assert!(matches!(err, PipeError::EmptySweep { .. }));
    }

    #[test]
    fn missing_user_command_is_rejected() {
        let err = ArrayJob::new("nonexistent-binary-xyz", files())
            .runner(runner())
            .build()
            .unwrap_err();
        assert!(matches!(err, PipeError::NotFound { .. }));
    }

    /// Undo `quote` the way the scheduler's shell does
    fn shell_unquote(arg: &str) -> String {
        let inner = &arg[1..arg.len() - 1];
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => out.extend(chars.next()),
                c => out.push(c),
            }
        }
        out
    }

    #[test]
    fn runner_reads_back_values_that_look_like_flags() {
        let values = ["-1", "0", "--", "-2", "=x", "a b"].map(String::from);
        let sweep = CombinationSet::new(SweepMode::Zip).slot(1, values.clone());
        let job = ArrayJob::new("echo", sweep)
            .args(["{1}"])
            .runner(runner())
            .build()
            .unwrap();

        // Skip the runner's own prefix ("piperun", "array-run")
        let received: Vec<String> = job.args()[2..]
            .iter()
            .map(|a| {
                if a.starts_with('"') {
                    shell_unquote(a)
                } else {
                    a.clone()
                }
            })
            .collect();

        let run = ArrayRun::parse(&received, SweepMode::Zip).unwrap();
        assert_eq!(run.sweep.slots()[&1], values.to_vec());
        assert_eq!(run.command, vec!["echo", "{1}"]);
    }

    #[test]
    fn quoting_escapes_shell_specials() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
    }
}
