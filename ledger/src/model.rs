use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one stock row: a good held in a warehouse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub good_id: i64,
    pub warehouse_id: i64,
}

impl Pair {
    pub fn new(good_id: i64, warehouse_id: i64) -> Self {
        Self {
            good_id,
            warehouse_id,
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(good={}, warehouse={})", self.good_id, self.warehouse_id)
    }
}

/// Durable stock counters for a pair.
///
/// Invariant after every committed mutation: `0 <= reserved <= count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub good_id: i64,
    pub warehouse_id: i64,
    pub count: i64,
    pub reserved: i64,
}

impl LedgerRow {
    pub fn new(pair: Pair, count: i64, reserved: i64) -> Self {
        Self {
            good_id: pair.good_id,
            warehouse_id: pair.warehouse_id,
            count,
            reserved,
        }
    }

    pub fn pair(&self) -> Pair {
        Pair::new(self.good_id, self.warehouse_id)
    }

    /// At least one unit is still free to reserve.
    pub fn has_capacity(&self) -> bool {
        self.reserved < self.count
    }

    pub fn available(&self) -> i64 {
        self.count - self.reserved
    }

    pub fn is_consistent(&self) -> bool {
        self.count >= 0 && self.reserved >= 0 && self.reserved <= self.count
    }
}

/// Transaction isolation requested from the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Isolation {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl Isolation {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Isolation::ReadCommitted => "READ COMMITTED",
            Isolation::RepeatableRead => "REPEATABLE READ",
            Isolation::Serializable => "SERIALIZABLE",
        }
    }
}
