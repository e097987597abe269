//! Postgres-backed ledger over the `goods_warehouse` table.
//!
//! Row locks are real `SELECT ... FOR UPDATE` locks, so any number of service
//! instances can share one database and still never double-spend a unit.
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{trace, warn};

use super::StockLedger;
use crate::error::LedgerError;
use crate::model::{Isolation, LedgerRow, Pair};

const LOCK_ROW: &str = r#"
SELECT good_id, warehouse_id, count, reserved
FROM goods_warehouse
WHERE good_id = $1 AND warehouse_id = $2
FOR UPDATE
"#;

const INCREMENT_RESERVED: &str = r#"
UPDATE goods_warehouse
SET reserved = reserved + 1
WHERE good_id = $1 AND warehouse_id = $2 AND reserved < count
"#;

const RESET_RESERVED: &str = r#"
UPDATE goods_warehouse
SET reserved = 0
WHERE good_id = $1 AND warehouse_id = $2
"#;

/// Lock waits longer than this are logged as slow.
const SLOW_LOCK: Duration = Duration::from_millis(250);

#[derive(Clone)]
pub struct PgStockLedger {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PgStockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bounds how long a transaction waits for a row lock on the server.
    /// A wait that runs out fails that pair with a ledger error and frees
    /// the connection.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl StockLedger for PgStockLedger {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self, isolation: Isolation) -> Result<Self::Tx, LedgerError> {
        let mut tx = self.pool.begin().await?;
        // must be the first statement of the transaction
        sqlx::query(&format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            isolation.as_sql()
        ))
        .execute(&mut *tx)
        .await?;

        if let Some(timeout) = self.lock_timeout {
            // SET does not take bind parameters
            sqlx::query(&format!(
                "SET LOCAL lock_timeout = '{}ms'",
                timeout.as_millis().max(1)
            ))
            .execute(&mut *tx)
            .await?;
        }
        Ok(tx)
    }

    async fn lock_row(
        &self,
        tx: &mut Self::Tx,
        pair: Pair,
    ) -> Result<Option<LedgerRow>, LedgerError> {
        let started = Instant::now();
        let row = sqlx::query(LOCK_ROW)
            .bind(pair.good_id)
            .bind(pair.warehouse_id)
            .fetch_optional(&mut **tx)
            .await?;

        let waited = started.elapsed();
        if waited > SLOW_LOCK {
            warn!(
                target: "performance",
                %pair,
                waited_ms = waited.as_millis() as u64,
                "slow row lock"
            );
        }

        let Some(r) = row else {
            return Ok(None);
        };

        let locked = LedgerRow {
            good_id: r.try_get("good_id")?,
            warehouse_id: r.try_get("warehouse_id")?,
            count: r.try_get("count")?,
            reserved: r.try_get("reserved")?,
        };
        trace!(%pair, count = locked.count, reserved = locked.reserved, "row locked");
        Ok(Some(locked))
    }

    async fn increment_reserved(&self, tx: &mut Self::Tx, pair: Pair) -> Result<(), LedgerError> {
        let done = sqlx::query(INCREMENT_RESERVED)
            .bind(pair.good_id)
            .bind(pair.warehouse_id)
            .execute(&mut **tx)
            .await?;

        // the guard in the WHERE clause only misses when the row is full
        if done.rows_affected() != 1 {
            return Err(LedgerError::RowChanged(pair));
        }
        Ok(())
    }

    async fn reset_reserved(&self, tx: &mut Self::Tx, pair: Pair) -> Result<(), LedgerError> {
        let done = sqlx::query(RESET_RESERVED)
            .bind(pair.good_id)
            .bind(pair.warehouse_id)
            .execute(&mut **tx)
            .await?;

        if done.rows_affected() != 1 {
            return Err(LedgerError::RowChanged(pair));
        }
        Ok(())
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), LedgerError> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), LedgerError> {
        tx.rollback().await?;
        Ok(())
    }
}
