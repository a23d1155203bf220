//! Which slice of a sweep belongs to the current array task
//!
//! Task `t` of `M` owns `[floor(L*(t-1)/M), floor(L*t/M))`, the last task
//! running to `L`. Boundaries are computed in integer arithmetic so every
//! `(L, M)` pair tiles `0..L` exactly, with slice sizes differing by at most one.

use std::ops::Range;

use tracing::{debug, warn};

/// Grid Engine variable holding the 1-based task index
pub const TASK_ID_VAR: &str = "SGE_TASK_ID";
/// Grid Engine variable holding the last task index of the array
pub const TASK_LAST_VAR: &str = "SGE_TASK_LAST";

/// Position of this worker among the co-scheduled array tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionIndex {
    index: usize,
    count: usize,
}

impl Default for PartitionIndex {
    fn default() -> Self {
        Self::SINGLE
    }
}

impl PartitionIndex {
    /// Task 1 of 1: the whole sequence
    pub const SINGLE: PartitionIndex = PartitionIndex { index: 1, count: 1 };

    /// `None` unless `1 <= index <= count`
    pub fn new(index: usize, count: usize) -> Option<Self> {
        (index >= 1 && index <= count).then_some(Self { index, count })
    }

    /// Read the Grid Engine task variables
    pub fn from_env() -> Self {
        Self::from_vars(TASK_ID_VAR, TASK_LAST_VAR)
    }

    /// Read index/count from arbitrary variable names
    pub fn from_vars(index_var: &str, count_var: &str) -> Self {
        Self::from_values(
            std::env::var(index_var).ok().as_deref(),
            std::env::var(count_var).ok().as_deref(),
        )
    }

    /// Parse raw index/count text, falling back to [`PartitionIndex::SINGLE`]
    pub fn from_values(index: Option<&str>, count: Option<&str>) -> Self {
        let parsed = index
            .zip(count)
            .and_then(|(i, c)| Some((i.trim().parse().ok()?, c.trim().parse().ok()?)))
            .and_then(|(i, c)| Self::new(i, c));

        match parsed {
            Some(partition) => partition,
            None if index.is_none() && count.is_none() => {
                debug!("no task context, running as task 1 of 1");
                Self::SINGLE
            }
            None => {
                warn!(?index, ?count, "unusable task context, running as task 1 of 1");
                Self::SINGLE
            }
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_last(&self) -> bool {
        self.index == self.count
    }

    /// Index range owned by this task within a sequence of `len` items
    pub fn range(&self, len: usize) -> Range<usize> {
        let start = scaled(len, self.index - 1, self.count);
        let end = if self.is_last() {
            len
        } else {
            scaled(len, self.index, self.count)
        };
        start..end
    }

    pub fn slice<'a, T>(&self, sequence: &'a [T]) -> &'a [T] {
        &sequence[self.range(sequence.len())]
    }
}

/// floor(len * k / m) without intermediate overflow
fn scaled(len: usize, k: usize, m: usize) -> usize {
    ((len as u128 * k as u128) / m as u128) as usize
}

/// Slice of `sequence` owned by the task described by the environment
pub fn current_slice<T>(sequence: &[T]) -> &[T] {
    PartitionIndex::from_env().slice(sequence)
}
