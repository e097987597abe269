use thiserror::Error;

use crate::model::Pair;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("row {0} is not locked by this transaction")]
    NotLocked(Pair),

    #[error("row {pair} would violate 0 <= reserved <= count (count={count}, reserved={reserved})")]
    InvariantViolated {
        pair: Pair,
        count: i64,
        reserved: i64,
    },

    #[error("row {0} changed while locked")]
    RowChanged(Pair),
}
