//! Scheduler-assigned job identifiers
//!
//! `qsub -terse` prints `1234` for ordinary jobs and `1234.1-3:1` for array
//! jobs. Dependencies always reference the numeric part.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::PipeError;

static JOB_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:\.(\S+))?$").expect("job id regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct JobId {
    number: u64,
    array: Option<String>,
}

impl JobId {
    pub fn new(number: u64) -> Self {
        Self {
            number,
            array: None,
        }
    }

    pub fn with_array(number: u64, range: impl Into<String>) -> Self {
        Self {
            number,
            array: Some(range.into()),
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// Task range reported by the scheduler, for array jobs
    pub fn array(&self) -> Option<&str> {
        self.array.as_deref()
    }

    /// The reference successors put in their hold lists
    pub fn dependency_ref(&self) -> String {
        self.number.to_string()
    }
}

impl FromStr for JobId {
    type Err = PipeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let invalid = || PipeError::InvalidJobId {
            raw: trimmed.to_string(),
        };
        let caps = JOB_ID_RE.captures(trimmed).ok_or_else(invalid)?;
        let number = caps[1].parse::<u64>().map_err(|_| invalid())?;
        Ok(Self {
            number,
            array: caps.get(2).map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.array {
            Some(range) => write!(f, "{}.{}", self.number, range),
            None => write!(f, "{}", self.number),
        }
    }
}
