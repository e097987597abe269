//! Unit of work for one (good, warehouse) pair.
//!
//! ```text
//! Started ──lock_row──▶ RowLocked ──commit──▶ Committed
//!    │                      │
//!    └──────────────────────┴──rollback──▶ Aborted
//! ```
//!
//! A worker owns exactly one ledger transaction and never retries. Business
//! failures (missing row, no capacity, ledger errors after the transaction is
//! open, cancellation) come back as [`Outcome::Failed`]. Only a failure to
//! open the transaction at all is returned as a [`BatchError`], which the
//! coordinator treats as an escalation.
//!
//! A cancelled worker returns at once. Its rollback runs on a detached task,
//! because the backend may still be waiting on a row lock for the statement
//! that was interrupted.
use std::sync::Arc;

use ledger::{Isolation, Pair, StockLedger};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, warn};

use crate::error::BatchError;
use crate::types::{Direction, FailureReason, Outcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Started,
    RowLocked,
    Committed,
    Aborted,
}

pub struct ReservationWorker<L: StockLedger> {
    ledger: Arc<L>,
    direction: Direction,
    pair: Pair,
    isolation: Isolation,
    state: WorkerState,
}

impl<L: StockLedger> ReservationWorker<L> {
    pub fn new(ledger: Arc<L>, direction: Direction, pair: Pair, isolation: Isolation) -> Self {
        Self {
            ledger,
            direction,
            pair,
            isolation,
            state: WorkerState::Started,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Runs the state machine to a terminal state.
    ///
    /// Cancellation is honoured until the commit is issued; after that the
    /// commit's own result decides the outcome.
    pub async fn execute(&mut self, cancel: &CancellationToken) -> Result<Outcome, BatchError> {
        let begun = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            begun = self.ledger.begin(self.isolation) => Some(begun),
        };

        let mut tx = match begun {
            None => return Ok(self.abort(FailureReason::Cancelled)),
            Some(Ok(tx)) => tx,
            Some(Err(source)) => {
                self.state = WorkerState::Aborted;
                return Err(BatchError::LedgerUnavailable {
                    pair: self.pair,
                    source,
                });
            }
        };

        let applied = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FailureReason::Cancelled),
            applied = self.apply(&mut tx) => applied,
        };

        match applied {
            Ok(()) => match self.ledger.commit(tx).await {
                Ok(()) => {
                    self.state = WorkerState::Committed;
                    debug!(direction = self.direction.as_str(), "committed");
                    Ok(Outcome::Succeeded(self.pair))
                }
                Err(e) => Ok(self.abort(e.into())),
            },
            Err(FailureReason::Cancelled) => {
                self.detach_rollback(tx);
                Ok(self.abort(FailureReason::Cancelled))
            }
            Err(reason) => {
                if let Err(e) = self.ledger.rollback(tx).await {
                    warn!(error = %e, "rollback failed; transaction dropped");
                }
                Ok(self.abort(reason))
            }
        }
    }

    fn detach_rollback(&self, tx: L::Tx) {
        let ledger = Arc::clone(&self.ledger);
        let rollback = async move {
            if let Err(e) = ledger.rollback(tx).await {
                warn!(error = %e, "detached rollback failed; transaction dropped");
            }
        };
        tokio::spawn(rollback.in_current_span());
    }

    async fn apply(&mut self, tx: &mut L::Tx) -> Result<(), FailureReason> {
        let Some(row) = self.ledger.lock_row(tx, self.pair).await? else {
            return Err(FailureReason::RowNotFound);
        };
        self.state = WorkerState::RowLocked;
        debug!(count = row.count, reserved = row.reserved, "row locked");

        match self.direction {
            Direction::Reserve => {
                if !row.has_capacity() {
                    return Err(FailureReason::AllReserved);
                }
                self.ledger.increment_reserved(tx, self.pair).await?;
            }
            Direction::Release => {
                self.ledger.reset_reserved(tx, self.pair).await?;
            }
        }
        Ok(())
    }

    fn abort(&mut self, reason: FailureReason) -> Outcome {
        self.state = WorkerState::Aborted;
        debug!(%reason, "aborted");
        Outcome::failed(self.pair, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ledger::{LedgerRow, MemoryStockLedger};

    fn worker(
        ledger: &Arc<MemoryStockLedger>,
        direction: Direction,
        pair: Pair,
    ) -> ReservationWorker<MemoryStockLedger> {
        ReservationWorker::new(Arc::clone(ledger), direction, pair, Isolation::ReadCommitted)
    }

    #[tokio::test]
    async fn reserve_with_capacity_commits_one_unit() {
        let pair = Pair::new(1, 1);
        let ledger = Arc::new(MemoryStockLedger::with_rows([LedgerRow::new(pair, 2, 0)]));

        let mut w = worker(&ledger, Direction::Reserve, pair);
        assert_eq!(w.state(), WorkerState::Started);

        let outcome = w.execute(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, Outcome::Succeeded(pair));
        assert_eq!(w.state(), WorkerState::Committed);
        assert_eq!(ledger.row(pair).await, Some(LedgerRow::new(pair, 2, 1)));
    }

    #[tokio::test]
    async fn reserve_on_full_row_aborts_without_writing() {
        let pair = Pair::new(1, 1);
        let ledger = Arc::new(MemoryStockLedger::with_rows([LedgerRow::new(pair, 2, 2)]));

        let mut w = worker(&ledger, Direction::Reserve, pair);
        let outcome = w.execute(&CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, Outcome::failed(pair, FailureReason::AllReserved));
        assert_eq!(w.state(), WorkerState::Aborted);
        assert_eq!(ledger.row(pair).await, Some(LedgerRow::new(pair, 2, 2)));
    }

    #[tokio::test]
    async fn release_resets_reserved_regardless_of_prior_value() {
        let pair = Pair::new(4, 2);
        let ledger = Arc::new(MemoryStockLedger::with_rows([LedgerRow::new(pair, 9, 7)]));

        let outcome = worker(&ledger, Direction::Release, pair)
            .execute(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Succeeded(pair));
        assert_eq!(ledger.row(pair).await, Some(LedgerRow::new(pair, 9, 0)));
    }

    #[tokio::test]
    async fn missing_row_is_row_not_found_for_both_directions() {
        let ledger = Arc::new(MemoryStockLedger::new());
        let pair = Pair::new(2, 1);

        for direction in [Direction::Reserve, Direction::Release] {
            let mut w = worker(&ledger, direction, pair);
            let outcome = w.execute(&CancellationToken::new()).await.unwrap();
            assert_eq!(outcome, Outcome::failed(pair, FailureReason::RowNotFound));
            assert_eq!(w.state(), WorkerState::Aborted);
        }
    }

    #[tokio::test]
    async fn begin_failure_is_escalated() {
        let ledger = Arc::new(MemoryStockLedger::new());
        ledger.set_unavailable(true);

        let mut w = worker(&ledger, Direction::Reserve, Pair::new(1, 1));
        let err = w.execute(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, BatchError::LedgerUnavailable { .. }));
        assert_eq!(w.state(), WorkerState::Aborted);
    }

    #[tokio::test]
    async fn cancelled_before_start_never_opens_a_transaction() {
        let pair = Pair::new(1, 1);
        let ledger = Arc::new(MemoryStockLedger::with_rows([LedgerRow::new(pair, 1, 0)]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = worker(&ledger, Direction::Reserve, pair)
            .execute(&cancel)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::failed(pair, FailureReason::Cancelled));
        assert_eq!(ledger.transactions_started(), 0);
        assert_eq!(ledger.row(pair).await, Some(LedgerRow::new(pair, 1, 0)));
    }

    #[tokio::test]
    async fn cancelled_lock_wait_returns_while_the_holder_keeps_the_row() {
        let pair = Pair::new(1, 1);
        let ledger = Arc::new(MemoryStockLedger::with_rows([LedgerRow::new(pair, 3, 0)]));
        let mut holder = ledger.begin(Isolation::ReadCommitted).await.unwrap();
        ledger.lock_row(&mut holder, pair).await.unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let mut w = worker(&ledger, Direction::Reserve, pair);
        let outcome = tokio::time::timeout(Duration::from_secs(1), w.execute(&cancel))
            .await
            .expect("cancelled worker should not wait for the lock holder")
            .unwrap();

        assert_eq!(outcome, Outcome::failed(pair, FailureReason::Cancelled));
        assert_eq!(w.state(), WorkerState::Aborted);

        ledger.rollback(holder).await.unwrap();
        assert_eq!(ledger.row(pair).await, Some(LedgerRow::new(pair, 3, 0)));
    }
}
