use ledger::Pair;

use crate::types::{FailedPair, FailureReason, IdField};

/// Checks a single pair; the good id is checked before the warehouse id.
pub fn check(pair: &Pair) -> Result<(), FailureReason> {
    if pair.good_id <= 0 {
        return Err(FailureReason::InvalidId(IdField::Good));
    }
    if pair.warehouse_id <= 0 {
        return Err(FailureReason::InvalidId(IdField::Warehouse));
    }
    Ok(())
}

/// Splits a raw batch into pairs worth sending to the ledger and pairs that
/// are rejected up front. Relative order is kept in both outputs.
pub fn validate(pairs: &[Pair]) -> (Vec<Pair>, Vec<FailedPair>) {
    let mut valid = Vec::with_capacity(pairs.len());
    let mut rejected = Vec::new();

    for pair in pairs {
        match check(pair) {
            Ok(()) => valid.push(*pair),
            Err(reason) => rejected.push(FailedPair::new(*pair, reason)),
        }
    }

    (valid, rejected)
}
