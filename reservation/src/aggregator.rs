use tokio::sync::mpsc;
use tracing::trace;

use crate::types::{BatchResult, Outcome};

pub type OutcomeSender = mpsc::Sender<Outcome>;

/// Sole owner of the batch result while workers run.
///
/// Workers never touch the buckets; they send their outcome over a channel and
/// this task appends it, so completions are recorded one at a time in arrival
/// order. Collection ends once every sender is dropped.
pub struct ResultAggregator {
    rx: mpsc::Receiver<Outcome>,
    result: BatchResult,
}

impl ResultAggregator {
    pub fn channel(capacity: usize) -> (OutcomeSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                rx,
                result: BatchResult::default(),
            },
        )
    }

    pub async fn collect(mut self) -> BatchResult {
        while let Some(outcome) = self.rx.recv().await {
            trace!(pair = %outcome.pair(), "outcome recorded");
            self.result.record(outcome);
        }
        self.result
    }
}
