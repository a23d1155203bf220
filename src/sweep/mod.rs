//! Parameter sweeps - combination building and per-task slicing
//!
//! - `combination`: zip / cartesian rows from numbered value slots
//! - `partition`: which contiguous slice of rows an array task owns
//! - `template`: `{N}` substitution of a row into a command line

pub mod combination;
pub mod partition;
pub mod template;

pub use combination::{build, CombinationSet, SweepMode};
pub use partition::{current_slice, PartitionIndex, TASK_ID_VAR, TASK_LAST_VAR};
pub use template::{substitute, substitute_all};
