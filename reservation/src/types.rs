use std::fmt;

use ledger::{LedgerError, Pair};
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Take one unit: `reserved += 1`.
    Reserve,
    /// Give back everything held on the row: `reserved = 0`.
    Release,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Reserve => "reserve",
            Direction::Release => "release",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdField {
    Good,
    Warehouse,
}

impl fmt::Display for IdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdField::Good => f.write_str("good"),
            IdField::Warehouse => f.write_str("warehouse"),
        }
    }
}

/// Terminal, per-pair failure. None of these abort the rest of the batch.
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("{0} id is not positive")]
    InvalidId(IdField),

    #[error("good in this warehouse does not exist")]
    RowNotFound,

    #[error("all goods are reserved")]
    AllReserved,

    #[error("ledger error: {0}")]
    LedgerError(String),

    #[error("cancelled before commit")]
    Cancelled,
}

impl From<LedgerError> for FailureReason {
    fn from(e: LedgerError) -> Self {
        FailureReason::LedgerError(e.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedPair {
    #[serde(flatten)]
    pub pair: Pair,
    pub reason: FailureReason,
}

impl FailedPair {
    pub fn new(pair: Pair, reason: FailureReason) -> Self {
        Self { pair, reason }
    }
}

/// What a single worker reports back for its pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeeded(Pair),
    Failed(FailedPair),
}

impl Outcome {
    pub fn failed(pair: Pair, reason: FailureReason) -> Self {
        Outcome::Failed(FailedPair::new(pair, reason))
    }

    pub fn pair(&self) -> Pair {
        match self {
            Outcome::Succeeded(p) => *p,
            Outcome::Failed(f) => f.pair,
        }
    }
}

/// Partition of a batch into committed pairs and failed pairs.
///
/// Within each bucket entries appear in completion order, not submission
/// order; every entry carries its full pair so callers can re-sort.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub succeeded: Vec<Pair>,
    pub failed: Vec<FailedPair>,
}

impl BatchResult {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Succeeded(p) => self.succeeded.push(p),
            Outcome::Failed(f) => self.failed.push(f),
        }
    }

    /// Total number of outcomes; equals the batch size for a finished batch.
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn failures_with(&self, reason: &FailureReason) -> usize {
        self.failed.iter().filter(|f| &f.reason == reason).count()
    }

    pub fn reason_for(&self, pair: Pair) -> Option<&FailureReason> {
        self.failed.iter().find(|f| f.pair == pair).map(|f| &f.reason)
    }
}
