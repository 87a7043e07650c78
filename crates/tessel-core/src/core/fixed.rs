//! Fixed-thread dispatch: each OS thread owns a contiguous range of pieces.

use std::ops::Range;
use std::thread;

use crate::config::DispatchOptions;
use crate::core::control::ExecutionControl;
use crate::core::invoker::{KernelInvoker, PieceContext};
use crate::core::state::RunState;
use crate::error::{TesselError, panic_message};
use crate::split::split_extent;
use crate::types::{Extent, Result, WorkItem};

/// Pieces planned for one fixed-thread run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FixedPlan {
    pub requested: usize,
    pub total: usize,
    pub workers: usize,
}

impl FixedPlan {
    pub(crate) fn new(whole: &Extent, options: &DispatchOptions) -> Self {
        let requested = options.clamped_threads();
        let (_, total) = split_extent(whole, 0, requested, &options.split);
        Self {
            requested,
            total,
            workers: requested.min(total),
        }
    }

    /// Contiguous piece range owned by `thread_id`.
    pub(crate) fn pieces_for(&self, thread_id: usize) -> Range<usize> {
        let start = thread_id * self.total / self.workers;
        let end = (thread_id + 1) * self.total / self.workers;
        start..end
    }
}

pub(crate) fn run<K>(
    whole: &Extent,
    options: &DispatchOptions,
    plan: FixedPlan,
    invoker: &KernelInvoker<'_>,
    control: &dyn ExecutionControl,
    state: &RunState,
    kernel: &K,
) where
    K: Fn(&PieceContext<'_>) -> Result<()> + Sync,
{
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(plan.workers);
        for thread_id in 0..plan.workers {
            let pieces = plan.pieces_for(thread_id);
            handles.push((
                pieces.start,
                scope.spawn(move || {
                    run_worker(
                        thread_id, pieces, whole, options, plan, invoker, control, state, kernel,
                    )
                }),
            ));
        }

        for (first_piece, handle) in handles {
            if let Err(payload) = handle.join() {
                invoker.failures().record(
                    first_piece,
                    TesselError::WorkerPanicked(panic_message(payload.as_ref())),
                );
            }
        }
    });
}

#[allow(clippy::too_many_arguments)]
fn run_worker<K>(
    thread_id: usize,
    pieces: Range<usize>,
    whole: &Extent,
    options: &DispatchOptions,
    plan: FixedPlan,
    invoker: &KernelInvoker<'_>,
    control: &dyn ExecutionControl,
    state: &RunState,
    kernel: &K,
) where
    K: Fn(&PieceContext<'_>) -> Result<()> + Sync,
{
    state.worker_started(thread_id);
    let owned = pieces.len();

    for (done, piece) in pieces.clone().enumerate() {
        if control.abort_requested() {
            for skipped in piece..pieces.end {
                invoker.telemetry().on_piece_skipped(thread_id, skipped);
            }
            state.skip(pieces.end - piece);
            break;
        }

        let (extent, _) = split_extent(whole, piece, plan.total, &options.split);
        let item = WorkItem::new(piece, extent, thread_id, thread_id == 0);
        let outcome = invoker.invoke(item, kernel);
        state.record(thread_id, outcome);
        // Silent unless this worker owns more than one piece.
        invoker.progress().report(&item, done + 1, owned);
    }

    state.worker_stopped(thread_id);
}
