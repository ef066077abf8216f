//! Thread-batch scheduler for the analysis phase.
//!
//! `N` work items and a requested thread count `T` are split into
//! `N / T'` full batches of `T' = min(T, N)` workers plus one final batch
//! of `N % T'`. Every worker of a batch is spawned before the batch is
//! joined, and the next batch starts only after the join, so at most `T'`
//! workers are ever in flight.
//!
//! Workers never touch shared state: each sends `(index, result)` back over
//! a channel and the caller writes results after the barrier. Item `i` is
//! handled by exactly one worker.

use crate::error::PipelineError;
use std::time::Instant;
use tracing::{debug, trace};

/// Batch shape for a given node count and requested thread count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    /// Workers per full batch, `min(requested, nodes)`.
    pub threads: usize,
    pub full_batches: usize,
    /// Size of the trailing partial batch, 0 if none.
    pub remainder: usize,
}

impl BatchPlan {
    pub fn new(nodes: usize, requested: usize) -> Self {
        let threads = requested.min(nodes);
        if threads == 0 {
            return Self {
                threads: 0,
                full_batches: 0,
                remainder: 0,
            };
        }
        Self {
            threads,
            full_batches: nodes / threads,
            remainder: nodes % threads,
        }
    }

    /// Total number of batches, the partial one included.
    pub fn batch_count(&self) -> usize {
        self.full_batches + usize::from(self.remainder > 0)
    }
}

/// Run `work` once per item in bounded batches.
///
/// After each batch, `stop` is checked against that batch's results; if it
/// holds for any of them no further batch is started. The returned vector
/// is aligned with `items`, with `None` for items that never ran.
pub fn run_batched<T, R, W, S>(
    items: &[T],
    requested_threads: usize,
    work: W,
    stop: S,
) -> Result<Vec<Option<R>>, PipelineError>
where
    T: Sync,
    R: Send,
    W: Fn(&T) -> R + Sync,
    S: Fn(&R) -> bool,
{
    let mut slots: Vec<Option<R>> = items.iter().map(|_| None).collect();
    let plan = BatchPlan::new(items.len(), requested_threads);
    if plan.threads == 0 {
        return Ok(slots);
    }

    debug!(
        "Analysing {} nodes: {} batches of {} + {}",
        items.len(),
        plan.full_batches,
        plan.threads,
        plan.remainder
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(plan.threads)
        .thread_name(|i| format!("pftree-analyse-{i}"))
        .build()?;
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, R)>();

    for (batch_no, batch) in items.chunks(plan.threads).enumerate() {
        let start = Instant::now();
        let offset = batch_no * plan.threads;

        pool.scope(|scope| {
            for (i, item) in batch.iter().enumerate() {
                let tx = result_tx.clone();
                let work = &work;
                scope.spawn(move |_| {
                    // The receiver outlives the scope, so this cannot fail.
                    let _ = tx.send((offset + i, work(item)));
                });
            }
        });

        let mut halt = false;
        for (index, result) in result_rx.try_iter() {
            halt |= stop(&result);
            slots[index] = Some(result);
        }
        trace!(
            "Batch {}/{} ({} workers) joined in {:?}",
            batch_no + 1,
            plan.batch_count(),
            batch.len(),
            start.elapsed()
        );
        if halt {
            debug!("Stopping after batch {}", batch_no + 1);
            break;
        }
    }

    Ok(slots)
}
