use ledger::{LedgerError, Pair};
use thiserror::Error;

/// Batch-wide failures. Any of these voids the whole call; per-pair business
/// failures are reported through [`crate::FailureReason`] instead.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("ledger unavailable before {pair} could start: {source}")]
    LedgerUnavailable {
        pair: Pair,
        #[source]
        source: LedgerError,
    },

    #[error("result aggregator stopped before the batch finished")]
    AggregatorClosed,

    #[error("worker task failed: {0}")]
    WorkerPanicked(String),
}
