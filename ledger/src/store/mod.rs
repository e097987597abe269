pub mod memory_store;
pub mod postgres_store;

use async_trait::async_trait;

use crate::error::LedgerError;
use crate::model::{Isolation, LedgerRow, Pair};

/// Transactional access to the stock counters.
///
/// The row lock taken by [`StockLedger::lock_row`] is the only thing that
/// serialises concurrent mutators of a row. It is held by the transaction
/// until [`StockLedger::commit`] or [`StockLedger::rollback`], so the same
/// contract holds whether the ledger lives in this process or is shared by
/// several service instances.
#[async_trait]
pub trait StockLedger: Send + Sync + 'static {
    type Tx: Send + 'static;

    async fn begin(&self, isolation: Isolation) -> Result<Self::Tx, LedgerError>;

    /// Exclusively locks the row, waiting behind any concurrent holder.
    /// Returns `None` when no stock was ever added for the pair.
    async fn lock_row(&self, tx: &mut Self::Tx, pair: Pair)
    -> Result<Option<LedgerRow>, LedgerError>;

    /// `reserved += 1` on a row locked by `tx`. Fails without writing when
    /// the row has no free capacity.
    async fn increment_reserved(&self, tx: &mut Self::Tx, pair: Pair) -> Result<(), LedgerError>;

    /// `reserved = 0` on a row locked by `tx`.
    async fn reset_reserved(&self, tx: &mut Self::Tx, pair: Pair) -> Result<(), LedgerError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), LedgerError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), LedgerError>;
}
