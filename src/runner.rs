//! Array runner (`piperun array-run`)
//!
//! Runs inside one scheduler array task. Rebuilds the combination set from
//! the `-N v…` slots, takes this task's share of the rows, substitutes `{N}`
//! in the command and runs it once per row.
//!
//! ```text
//! piperun array-run [--product] -1 a b c -2 x y z -- cmd --in {1} --out {2}
//! ```
//!
//! A value with a leading `=` is taken literally after dropping that `=`,
//! so `-1 =-5 =--` is the slot `["-5", "--"]`. Array jobs always write values
//! this way.

use std::collections::BTreeMap;
use std::process::Command;

use tracing::{debug, info, instrument};

use crate::error::{PipeError, Result};
use crate::sweep::{substitute_all, CombinationSet, PartitionIndex, SweepMode};

/// Parsed `array-run` invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRun {
    pub sweep: CombinationSet<String>,
    pub command: Vec<String>,
}

impl ArrayRun {
    /// Parse `-N value…` groups followed by `--` and the command template
    pub fn parse<S: AsRef<str>>(raw: &[S], mode: SweepMode) -> Result<Self> {
        let mut slots: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        let mut current: Option<usize> = None;
        let mut tokens = raw.iter().map(AsRef::as_ref);

        for token in tokens.by_ref() {
            let value = match token.strip_prefix('=') {
                Some(literal) => literal,
                None if token == "--" => break,
                None => match slot_flag(token) {
                    Some(slot) => {
                        if slots.contains_key(&slot) {
                            return Err(invalid(format!("slot -{} given twice", slot)));
                        }
                        slots.insert(slot, Vec::new());
                        current = Some(slot);
                        continue;
                    }
                    None => token,
                },
            };
            match current {
                Some(slot) => slots.entry(slot).or_default().push(value.to_string()),
                None => return Err(invalid(format!("value '{}' before any -N slot", value))),
            }
        }

        let command: Vec<String> = tokens.map(String::from).collect();
        if command.is_empty() {
            return Err(invalid("missing command after '--'"));
        }
        if slots.is_empty() {
            return Err(invalid("at least one -N slot is required"));
        }
        if let Some((slot, _)) = slots.iter().find(|(_, values)| values.is_empty()) {
            return Err(invalid(format!("slot -{} has no values", slot)));
        }

        Ok(Self {
            sweep: CombinationSet::from_slots(slots, mode),
            command,
        })
    }

    /// Command lines this task would run, in row order
    pub fn plan(&self, partition: PartitionIndex) -> Result<Vec<Vec<String>>> {
        let rows = self.sweep.build();
        partition
            .slice(&rows)
            .iter()
            .map(|row| substitute_all(&self.command, row.as_slice()))
            .collect()
    }

    /// Run every planned command; returns the highest exit status seen
    #[instrument(skip(self), fields(task = partition.index(), of = partition.count()))]
    pub fn run(&self, partition: PartitionIndex) -> Result<i32> {
        let plan = self.plan(partition)?;
        info!(rows = plan.len(), "Running array task");

        let mut worst = 0;
        for argv in plan {
            let code = run_one(&argv)?;
            worst = worst.max(code);
        }
        Ok(worst)
    }
}

fn run_one(argv: &[String]) -> Result<i32> {
    let Some((program, args)) = argv.split_first() else {
        return Err(invalid("empty command"));
    };
    debug!(command = %argv.join(" "), "Running row");

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| PipeError::RunnerFailed {
            command: program.clone(),
            reason: e.to_string(),
        })?;

    // Killed by a signal: no code, report as a plain failure
    Ok(status.code().unwrap_or(1))
}

/// `-1`, `-2`, … (1-based slot numbers)
fn slot_flag(token: &str) -> Option<usize> {
    let digits = token.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&n| n > 0)
}

fn invalid(reason: impl Into<String>) -> PipeError {
    PipeError::InvalidRunnerArgs {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn parses_slots_and_command() {
        let run = ArrayRun::parse(&argv("-1 a b -2 x y -- echo {1} {2}"), SweepMode::Zip).unwrap();
        assert_eq!(run.sweep.slots()[&1], vec!["a", "b"]);
        assert_eq!(run.sweep.slots()[&2], vec!["x", "y"]);
        assert_eq!(run.command, vec!["echo", "{1}", "{2}"]);
    }

    #[test]
    fn command_may_contain_slot_like_tokens() {
        let run = ArrayRun::parse(&argv("-1 a -- tail -5 {1}"), SweepMode::Zip).unwrap();
        assert_eq!(run.command, vec!["tail", "-5", "{1}"]);
    }

    #[test]
    fn rejects_malformed_arguments() {
        let cases = [
            "a -1 b -- echo",
            "-1 a b",
            "-1 a -- ",
            "-1 -2 b -- echo",
            "-1 a -1 b -- echo",
            "-- echo",
        ];
        for case in cases {
            let err = ArrayRun::parse(&argv(case), SweepMode::Zip).unwrap_err();
            assert!(
                matches!(err, PipeError::InvalidRunnerArgs { .. }),
                "{case}: {err}"
            );
        }
    }

    #[test]
    fn prefixed_values_are_literal() {
        let run = ArrayRun::parse(
            &argv("-1 =-2 =0 =-- ==x plain -2 =-1 -- echo {1} {2}"),
            SweepMode::Zip,
        )
        .unwrap();
        assert_eq!(run.sweep.slots()[&1], vec!["-2", "0", "--", "=x", "plain"]);
        assert_eq!(run.sweep.slots()[&2], vec!["-1"]);
        assert_eq!(run.command, vec!["echo", "{1}", "{2}"]);
    }

    #[test]
    fn prefixed_value_before_any_slot_is_rejected() {
        let err = ArrayRun::parse(&argv("=a -1 b -- echo"), SweepMode::Zip).unwrap_err();
        assert!(matches!(err, PipeError::InvalidRunnerArgs { .. }));
    }

    #[test]
    fn negative_numbers_are_not_values_of_slot_zero() {
        assert_eq!(slot_flag("-3"), Some(3));
        assert_eq!(slot_flag("-0"), None);
        assert_eq!(slot_flag("-x"), None);
        assert_eq!(slot_flag("-"), None);
        assert_eq!(slot_flag("3"), None);
    }

    #[test]
    fn plan_takes_only_this_tasks_rows() {
        let run = ArrayRun::parse(
            &argv("-1 a b c d e f g -- echo {1}"),
            SweepMode::Zip,
        )
        .unwrap();

        let second = run.plan(PartitionIndex::new(2, 3).unwrap()).unwrap();
        assert_eq!(second, vec![argv("echo c"), argv("echo d")]);

        let last = run.plan(PartitionIndex::new(3, 3).unwrap()).unwrap();
        assert_eq!(last, vec![argv("echo e"), argv("echo f"), argv("echo g")]);
    }

    #[test]
    fn product_mode_crosses_slots() {
        let run = ArrayRun::parse(&argv("-1 a b -2 x y -- echo {1}{2}"), SweepMode::Product).unwrap();
        let all = run.plan(PartitionIndex::SINGLE).unwrap();
        assert_eq!(
            all,
            vec![argv("echo ax"), argv("echo ay"), argv("echo bx"), argv("echo by")]
        );
    }

    #[test]
    fn missing_placeholder_value_is_an_error() {
        let run = ArrayRun::parse(&argv("-1 a -- echo {2}"), SweepMode::Zip).unwrap();
        assert!(matches!(
            run.plan(PartitionIndex::SINGLE),
            Err(PipeError::MissingPlaceholder { index: 2, .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn run_returns_highest_exit_status() {
        let run = ArrayRun {
            sweep: CombinationSet::new(SweepMode::Zip).slot(1, argv("0 3 1")),
            command: vec!["sh".into(), "-c".into(), "exit {1}".into()],
        };
        assert_eq!(run.run(PartitionIndex::SINGLE).unwrap(), 3);
    }

    #[test]
    fn unknown_program_is_a_runner_error() {
        let run = ArrayRun::parse(&argv("-1 a -- nonexistent-binary-xyz {1}"), SweepMode::Zip).unwrap();
        assert!(matches!(
            run.run(PartitionIndex::SINGLE),
            Err(PipeError::RunnerFailed { .. })
        ));
    }
}
