//! Fan-out / fan-in over a batch of pairs.
//!
//! Each valid pair gets its own task and its own ledger transaction. Tasks
//! share one cancellation scope, derived from the caller's token. The scope is
//! cancelled when:
//! - the caller cancels,
//! - the batch timeout elapses,
//! - a worker escalates (it could not even open its transaction).
//!
//! The first two produce a partial [`BatchResult`] in which unfinished pairs
//! are reported as [`FailureReason::Cancelled`]. An escalation fails the whole
//! call with the escalating [`BatchError`].
use std::sync::Arc;
use std::time::Duration;

use common::logger::{TraceId, batch_span, pair_span};
use ledger::{Isolation, Pair, StockLedger};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use crate::aggregator::ResultAggregator;
use crate::error::BatchError;
use crate::types::{BatchResult, Direction, FailureReason, Outcome};
use crate::validator::validate;
use crate::worker::ReservationWorker;

#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Upper bound on ledger transactions open at once, across all batches
    /// served by one coordinator. Keep it at or below the pool size.
    pub max_concurrency: usize,

    /// Wall-clock budget for one batch. Workers still running when it expires
    /// roll back and report `Cancelled`.
    pub batch_timeout: Duration,

    pub isolation: Isolation,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            batch_timeout: Duration::from_secs(30),
            isolation: Isolation::ReadCommitted,
        }
    }
}

pub struct BatchCoordinator<L: StockLedger> {
    ledger: Arc<L>,
    permits: Arc<Semaphore>,
    cfg: CoordinatorConfig,
}

impl<L: StockLedger> BatchCoordinator<L> {
    pub fn new(ledger: Arc<L>, cfg: CoordinatorConfig) -> Self {
        Self {
            ledger,
            permits: Arc::new(Semaphore::new(cfg.max_concurrency.max(1))),
            cfg,
        }
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.cfg
    }

    /// Stops admitting work. Pairs that have not yet taken a worker slot,
    /// in running batches and in any batch started afterwards, report
    /// `Cancelled`. Called once on shutdown.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub async fn reserve_batch(&self, pairs: Vec<Pair>) -> Result<BatchResult, BatchError> {
        self.run(Direction::Reserve, pairs, &CancellationToken::new())
            .await
    }

    pub async fn release_batch(&self, pairs: Vec<Pair>) -> Result<BatchResult, BatchError> {
        self.run(Direction::Release, pairs, &CancellationToken::new())
            .await
    }

    /// Runs one batch under `cancel`. Cancelling it returns the partial result
    /// instead of an error: committed pairs stay in `succeeded`, the rest are
    /// reported as `Cancelled`.
    pub async fn run(
        &self,
        direction: Direction,
        pairs: Vec<Pair>,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, BatchError> {
        let trace_id = TraceId::new();
        let span = batch_span(direction.as_str(), &trace_id, pairs.len());
        self.run_batch(direction, pairs, cancel).instrument(span).await
    }

    async fn run_batch(
        &self,
        direction: Direction,
        pairs: Vec<Pair>,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, BatchError> {
        let input = pairs.len();
        let (valid, rejected) = validate(&pairs);
        if !rejected.is_empty() {
            debug!(rejected = rejected.len(), "pairs rejected before reaching the ledger");
        }

        let scope = cancel.child_token();
        let (outcomes, aggregator) = ResultAggregator::channel(valid.len());
        let collector = tokio::spawn(aggregator.collect().in_current_span());

        let mut workers = JoinSet::new();
        for pair in valid {
            let mut worker =
                ReservationWorker::new(Arc::clone(&self.ledger), direction, pair, self.cfg.isolation);
            let permits = Arc::clone(&self.permits);
            let scope = scope.clone();
            let outcomes = outcomes.clone();

            let task = async move {
                // an Err here means the coordinator was closed
                let permit = tokio::select! {
                    biased;
                    _ = scope.cancelled() => None,
                    permit = permits.acquire_owned() => permit.ok(),
                };

                let outcome = match permit {
                    None => Outcome::failed(pair, FailureReason::Cancelled),
                    Some(_permit) => worker.execute(&scope).await?,
                };

                outcomes
                    .send(outcome)
                    .await
                    .map_err(|_| BatchError::AggregatorClosed)
            };
            workers.spawn(task.instrument(pair_span(pair.good_id, pair.warehouse_id)));
        }
        // the collector finishes once the last worker drops its sender
        drop(outcomes);

        let deadline = tokio::time::sleep(self.cfg.batch_timeout);
        tokio::pin!(deadline);
        let mut timed_out = false;
        let mut escalation: Option<BatchError> = None;

        loop {
            tokio::select! {
                joined = workers.join_next() => {
                    let Some(joined) = joined else { break };
                    let failure = match joined {
                        Ok(Ok(())) => None,
                        Ok(Err(e)) => Some(e),
                        Err(e) => Some(BatchError::WorkerPanicked(e.to_string())),
                    };
                    if let Some(e) = failure {
                        if escalation.is_none() {
                            error!(error = %e, "escalation: cancelling remaining workers");
                            scope.cancel();
                            escalation = Some(e);
                        } else {
                            debug!(error = %e, "further escalation after cancel");
                        }
                    }
                }
                _ = &mut deadline, if !timed_out => {
                    timed_out = true;
                    warn!(
                        timeout_ms = self.cfg.batch_timeout.as_millis() as u64,
                        "batch timed out; cancelling unfinished workers"
                    );
                    scope.cancel();
                }
            }
        }

        let mut result = collector
            .await
            .map_err(|e| BatchError::WorkerPanicked(e.to_string()))?;

        if let Some(e) = escalation {
            return Err(e);
        }

        result.failed.extend(rejected);

        if result.len() != input {
            error!(
                input,
                outcomes = result.len(),
                "outcome count does not match batch size"
            );
        }

        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            cancelled = scope.is_cancelled(),
            "batch finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::{LedgerRow, MemoryStockLedger};
    use tracing_test::traced_test;

    fn coordinator(ledger: MemoryStockLedger) -> BatchCoordinator<MemoryStockLedger> {
        BatchCoordinator::new(Arc::new(ledger), CoordinatorConfig::default())
    }

    #[tokio::test]
    async fn mixed_batch_reports_every_pair() {
        let ledger = MemoryStockLedger::with_rows([LedgerRow::new(Pair::new(1, 1), 1, 0)]);
        let c = coordinator(ledger);

        let result = c
            .reserve_batch(vec![Pair::new(1, 1), Pair::new(2, 1)])
            .await
            .unwrap();

        assert_eq!(result.succeeded, vec![Pair::new(1, 1)]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(
            result.reason_for(Pair::new(2, 1)),
            Some(&FailureReason::RowNotFound)
        );
    }

    #[tokio::test]
    async fn pre_rejected_pairs_never_open_a_transaction() {
        let c = coordinator(MemoryStockLedger::new());

        let result = c.reserve_batch(vec![Pair::new(-1, 5)]).await.unwrap();

        assert!(result.succeeded.is_empty());
        assert_eq!(
            result.reason_for(Pair::new(-1, 5)),
            Some(&FailureReason::InvalidId(crate::types::IdField::Good))
        );
        assert_eq!(c.ledger().transactions_started(), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_empty_result() {
        let c = coordinator(MemoryStockLedger::new());
        let result = c.release_batch(vec![]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn unreachable_ledger_fails_the_whole_batch() {
        let ledger = MemoryStockLedger::with_rows([LedgerRow::new(Pair::new(1, 1), 5, 0)]);
        ledger.set_unavailable(true);
        let c = coordinator(ledger);

        let err = c
            .reserve_batch(vec![Pair::new(1, 1), Pair::new(1, 1), Pair::new(-3, 1)])
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::LedgerUnavailable { .. }));
        assert!(logs_contain("escalation: cancelling remaining workers"));
    }

    #[tokio::test]
    async fn pre_cancelled_batch_reports_everything_cancelled() {
        let ledger = MemoryStockLedger::with_rows([LedgerRow::new(Pair::new(1, 1), 5, 0)]);
        let c = coordinator(ledger);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = c
            .run(Direction::Reserve, vec![Pair::new(1, 1), Pair::new(1, 1)], &cancel)
            .await
            .unwrap();

        assert!(result.succeeded.is_empty());
        assert_eq!(result.failures_with(&FailureReason::Cancelled), 2);
        assert_eq!(
            c.ledger().row(Pair::new(1, 1)).await,
            Some(LedgerRow::new(Pair::new(1, 1), 5, 0))
        );
    }

    #[tokio::test]
    async fn closed_coordinator_admits_no_work() {
        let ledger = MemoryStockLedger::with_rows([LedgerRow::new(Pair::new(1, 1), 5, 0)]);
        let c = coordinator(ledger);
        c.close();
        assert!(c.is_closed());

        let result = c
            .reserve_batch(vec![Pair::new(1, 1), Pair::new(0, 1)])
            .await
            .unwrap();

        assert!(result.succeeded.is_empty());
        assert_eq!(
            result.reason_for(Pair::new(1, 1)),
            Some(&FailureReason::Cancelled)
        );
        assert_eq!(
            result.reason_for(Pair::new(0, 1)),
            Some(&FailureReason::InvalidId(crate::types::IdField::Good))
        );
        assert_eq!(c.ledger().transactions_started(), 0);
    }
}
