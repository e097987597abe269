use std::collections::HashMap;
use std::sync::Arc;

use ledger::{LedgerRow, MemoryStockLedger, Pair};
use proptest::prelude::*;
use reservation::{BatchCoordinator, CoordinatorConfig, FailureReason};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
}

fn stock() -> impl Strategy<Value = Vec<(i64, i64)>> {
    // (count, reserved) for goods 1..=n in warehouse 1
    prop::collection::vec((0i64..6).prop_flat_map(|count| (Just(count), 0..=count)), 1..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_pair_lands_in_exactly_one_bucket(
        rows in stock(),
        picks in prop::collection::vec((-1i64..8, -1i64..3), 0..40),
    ) {
        let ledger = MemoryStockLedger::with_rows(
            rows.iter()
                .enumerate()
                .map(|(i, (count, reserved))| LedgerRow::new(Pair::new(i as i64 + 1, 1), *count, *reserved)),
        );
        let c = BatchCoordinator::new(Arc::new(ledger), CoordinatorConfig::default());
        let batch: Vec<Pair> = picks.iter().map(|(g, w)| Pair::new(*g, *w)).collect();

        let result = runtime().block_on(c.reserve_batch(batch.clone())).expect("batch");

        prop_assert_eq!(result.len(), batch.len());
        prop_assert_eq!(
            result.failed.iter().filter(|f| f.reason == FailureReason::Cancelled).count(),
            0
        );
    }

    #[test]
    fn successes_per_pair_match_free_capacity(
        rows in stock(),
        requests in prop::collection::vec(1i64..6, 0..30),
    ) {
        let pairs: Vec<LedgerRow> = rows
            .iter()
            .enumerate()
            .map(|(i, (count, reserved))| LedgerRow::new(Pair::new(i as i64 + 1, 1), *count, *reserved))
            .collect();
        let ledger = Arc::new(MemoryStockLedger::with_rows(pairs.clone()));
        let c = BatchCoordinator::new(Arc::clone(&ledger), CoordinatorConfig::default());
        let batch: Vec<Pair> = requests.iter().map(|g| Pair::new(*g, 1)).collect();

        let rt = runtime();
        let result = rt.block_on(c.reserve_batch(batch.clone())).expect("batch");

        let mut asked: HashMap<Pair, i64> = HashMap::new();
        for p in &batch {
            *asked.entry(*p).or_default() += 1;
        }
        let mut won: HashMap<Pair, i64> = HashMap::new();
        for p in &result.succeeded {
            *won.entry(*p).or_default() += 1;
        }

        for (pair, n) in asked {
            let row = pairs.iter().find(|r| r.pair() == pair);
            let expected = row.map_or(0, |r| n.min(r.available()));
            prop_assert_eq!(won.get(&pair).copied().unwrap_or(0), expected, "pair {}", pair);

            if let Some(before) = row {
                let after = rt.block_on(ledger.row(pair)).expect("row still present");
                prop_assert_eq!(after.reserved, before.reserved + expected);
                prop_assert!(after.is_consistent());
            }
        }
    }
}
