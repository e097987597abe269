//! In-process ledger.
//!
//! Every row sits behind its own async mutex. `lock_row` takes an owned guard
//! and parks it inside the transaction, so a second transaction on the same
//! row waits exactly like it would behind `SELECT ... FOR UPDATE`. Writes are
//! staged on a copy of the row and only published by `commit`; dropping or
//! rolling back the transaction releases the lock and discards them.
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, trace};

use super::StockLedger;
use crate::error::LedgerError;
use crate::model::{Isolation, LedgerRow, Pair};

type RowCell = Arc<Mutex<LedgerRow>>;

#[derive(Default)]
pub struct MemoryStockLedger {
    rows: RwLock<HashMap<Pair, RowCell>>,
    unavailable: AtomicBool,
    next_tx: AtomicU64,
}

pub struct MemoryTx {
    id: u64,
    isolation: Isolation,
    locked: HashMap<Pair, LockedRow>,
}

struct LockedRow {
    guard: OwnedMutexGuard<LedgerRow>,
    staged: LedgerRow,
}

impl MemoryTx {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    fn staged_mut(&mut self, pair: Pair) -> Result<&mut LedgerRow, LedgerError> {
        self.locked
            .get_mut(&pair)
            .map(|l| &mut l.staged)
            .ok_or(LedgerError::NotLocked(pair))
    }
}

impl MemoryStockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = LedgerRow>) -> Self {
        let ledger = Self::new();
        {
            let mut map = ledger.rows.write();
            for row in rows {
                map.insert(row.pair(), Arc::new(Mutex::new(row)));
            }
        }
        ledger
    }

    /// Adds `count` units, creating the row on first use.
    pub async fn add_stock(&self, pair: Pair, count: i64) -> Result<LedgerRow, LedgerError> {
        let cell = self
            .rows
            .write()
            .entry(pair)
            .or_insert_with(|| Arc::new(Mutex::new(LedgerRow::new(pair, 0, 0))))
            .clone();

        let mut row = cell.lock().await;
        let next = LedgerRow::new(pair, row.count + count, row.reserved);
        if !next.is_consistent() {
            return Err(LedgerError::InvariantViolated {
                pair,
                count: next.count,
                reserved: next.reserved,
            });
        }
        *row = next;
        debug!(%pair, count = row.count, "stock added");
        Ok(*row)
    }

    /// Last committed state of a row. Waits if a transaction holds the lock.
    pub async fn row(&self, pair: Pair) -> Option<LedgerRow> {
        let cell = self.rows.read().get(&pair).cloned();
        let row = *cell?.lock().await;
        Some(row)
    }

    /// Last committed state of every row, in no particular order.
    pub async fn rows(&self) -> Vec<LedgerRow> {
        let cells: Vec<RowCell> = self.rows.read().values().cloned().collect();
        let mut out = Vec::with_capacity(cells.len());
        for cell in cells {
            out.push(*cell.lock().await);
        }
        out
    }

    /// Simulates losing the connection: `begin` fails until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn transactions_started(&self) -> u64 {
        self.next_tx.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StockLedger for MemoryStockLedger {
    type Tx = MemoryTx;

    async fn begin(&self, isolation: Isolation) -> Result<MemoryTx, LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("memory ledger marked unavailable".into()));
        }
        let id = self.next_tx.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(tx = id, ?isolation, "begin");
        Ok(MemoryTx {
            id,
            isolation,
            locked: HashMap::new(),
        })
    }

    async fn lock_row(
        &self,
        tx: &mut MemoryTx,
        pair: Pair,
    ) -> Result<Option<LedgerRow>, LedgerError> {
        if let Some(locked) = tx.locked.get(&pair) {
            return Ok(Some(locked.staged));
        }

        let cell = self.rows.read().get(&pair).cloned();
        let Some(cell) = cell else {
            return Ok(None);
        };

        let guard = cell.lock_owned().await;
        let staged = *guard;
        trace!(tx = tx.id, %pair, "row locked");
        tx.locked.insert(pair, LockedRow { guard, staged });
        Ok(Some(staged))
    }

    async fn increment_reserved(&self, tx: &mut MemoryTx, pair: Pair) -> Result<(), LedgerError> {
        let row = tx.staged_mut(pair)?;
        if !row.has_capacity() {
            return Err(LedgerError::InvariantViolated {
                pair,
                count: row.count,
                reserved: row.reserved + 1,
            });
        }
        row.reserved += 1;
        Ok(())
    }

    async fn reset_reserved(&self, tx: &mut MemoryTx, pair: Pair) -> Result<(), LedgerError> {
        tx.staged_mut(pair)?.reserved = 0;
        Ok(())
    }

    async fn commit(&self, tx: MemoryTx) -> Result<(), LedgerError> {
        trace!(tx = tx.id, rows = tx.locked.len(), "commit");
        for (_, mut locked) in tx.locked {
            *locked.guard = locked.staged;
        }
        Ok(())
    }

    async fn rollback(&self, tx: MemoryTx) -> Result<(), LedgerError> {
        trace!(tx = tx.id, rows = tx.locked.len(), "rollback");
        drop(tx);
        Ok(())
    }
}
