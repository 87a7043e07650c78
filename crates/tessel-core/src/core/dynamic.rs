//! Dynamic dispatch: a work-stealing parallel-for over the piece range.

use rayon::prelude::*;

use crate::config::{DispatchOptions, clamp_threads};
use crate::core::control::ExecutionControl;
use crate::core::invoker::{KernelInvoker, PieceContext};
use crate::core::state::RunState;
use crate::error::TesselError;
use crate::split::split_extent;
use crate::types::{Extent, Result, WorkItem};

/// Pool the dynamic run executes on.
pub(crate) enum DynamicPool {
    Global,
    Dedicated(rayon::ThreadPool),
}

impl DynamicPool {
    pub(crate) fn for_options(options: &DispatchOptions) -> Result<Self> {
        let Some(threads) = options.dynamic_pool_threads else {
            return Ok(Self::Global);
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(clamp_threads(threads))
            .thread_name(|index| format!("tessel-worker-{index}"))
            .build()
            .map_err(|err| {
                TesselError::ThreadPool(format!("failed to build dispatch thread pool: {err}"))
            })?;
        Ok(Self::Dedicated(pool))
    }

    pub(crate) fn num_threads(&self) -> usize {
        match self {
            Self::Global => rayon::current_num_threads(),
            Self::Dedicated(pool) => pool.current_num_threads(),
        }
    }

    pub(crate) fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match self {
            Self::Global => op(),
            Self::Dedicated(pool) => pool.install(op),
        }
    }
}

/// Pieces planned for one dynamic run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DynamicPlan {
    pub requested: usize,
    pub total: usize,
}

impl DynamicPlan {
    pub(crate) fn new(whole: &Extent, options: &DispatchOptions, pool_threads: usize) -> Self {
        let requested = options.estimate_dynamic_pieces(whole, pool_threads);
        let (_, total) = split_extent(whole, 0, requested, &options.split);
        Self { requested, total }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn run<K>(
    whole: &Extent,
    options: &DispatchOptions,
    plan: DynamicPlan,
    pool: &DynamicPool,
    invoker: &KernelInvoker<'_>,
    control: &dyn ExecutionControl,
    state: &RunState,
    kernel: &K,
) where
    K: Fn(&PieceContext<'_>) -> Result<()> + Sync,
{
    pool.install(|| {
        (0..plan.total).into_par_iter().for_each(|piece| {
            let worker_id = rayon::current_thread_index().unwrap_or(0);
            if control.abort_requested() {
                invoker.telemetry().on_piece_skipped(worker_id, piece);
                state.skip(1);
                return;
            }

            state.worker_started(worker_id);
            let (extent, _) = split_extent(whole, piece, plan.total, &options.split);
            let item = WorkItem::new(piece, extent, worker_id, piece == 0);
            let outcome = invoker.invoke(item, kernel);
            state.record(worker_id, outcome);
            state.worker_stopped(worker_id);
        });
    });
}
