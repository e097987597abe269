use std::future::Future;
use std::time::{Duration, Instant};

use tracing::Span;

use super::TraceId;

/// Root span for one batch call. Worker spans nest under it.
pub fn batch_span(direction: &'static str, trace_id: &TraceId, size: usize) -> Span {
    tracing::info_span!(
        "batch",
        direction,
        trace_id = %trace_id,
        size
    )
}

/// Child span for the unit of work on a single (good, warehouse) pair.
pub fn pair_span(good_id: i64, warehouse_id: i64) -> Span {
    tracing::debug_span!("pair", good_id, warehouse_id)
}

/// Awaits `fut` and emits a warning under the `performance` target when it
/// takes longer than `max`.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
