//! Concurrent batch reservation / release over a [`ledger::StockLedger`].
//!
//! A batch is validated, fanned out to one worker per valid pair (each in its
//! own ledger transaction), and fanned back in through a single aggregator.
//! Every input pair ends up in exactly one bucket of the [`BatchResult`].

pub mod aggregator;
pub mod coordinator;
pub mod error;
pub mod types;
pub mod validator;
pub mod worker;

pub use coordinator::{BatchCoordinator, CoordinatorConfig};
pub use error::BatchError;
pub use types::{BatchResult, Direction, FailedPair, FailureReason, IdField, Outcome};
