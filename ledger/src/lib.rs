pub mod error;
pub mod model;
pub mod store;

pub use error::LedgerError;
pub use model::{Isolation, LedgerRow, Pair};
pub use store::StockLedger;
pub use store::memory_store::MemoryStockLedger;
pub use store::postgres_store::PgStockLedger;
