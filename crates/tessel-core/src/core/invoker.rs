use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::core::control::ExecutionControl;
use crate::core::progress::{ProgressAggregator, RowTicker};
use crate::error::{TesselError, panic_message};
use crate::telemetry::worker::WorkerTelemetry;
use crate::types::{Extent, Result, WorkItem};

/// What a kernel sees for one piece.
pub struct PieceContext<'r> {
    item: WorkItem,
    progress: &'r ProgressAggregator<'r>,
}

impl<'r> PieceContext<'r> {
    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    pub fn piece(&self) -> usize {
        self.item.piece
    }

    /// Sub-extent this piece owns.
    pub fn extent(&self) -> Extent {
        self.item.extent
    }

    pub fn thread_id(&self) -> usize {
        self.item.thread_id
    }

    pub fn is_leader(&self) -> bool {
        self.item.leader
    }

    /// Ticker for a kernel's row loop; only the leader's ticks publish.
    pub fn row_ticker(&self, rows: u64) -> RowTicker<'r, 'r> {
        self.progress.row_ticker(&self.item, rows)
    }
}

/// Result of invoking a kernel on one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceOutcome {
    Completed(Duration),
    Failed(Duration),
}

impl PieceOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Completed(elapsed) | Self::Failed(elapsed) => *elapsed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Failures recorded during one run.
#[derive(Debug, Default)]
pub struct FailureLog {
    failures: Mutex<Vec<(usize, TesselError)>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, piece: usize, error: TesselError) {
        lock_unpoisoned(&self.failures).push((piece, error));
    }

    pub fn failed_count(&self) -> usize {
        lock_unpoisoned(&self.failures).len()
    }

    /// Re-raises the failure with the lowest piece index, if any.
    pub fn into_result(self) -> Result<()> {
        let failures = match self.failures.into_inner() {
            Ok(failures) => failures,
            Err(poisoned) => poisoned.into_inner(),
        };
        let failed = failures.len();

        match failures.into_iter().min_by_key(|(piece, _)| *piece) {
            None => Ok(()),
            Some((piece, source)) => Err(TesselError::KernelFailed {
                piece,
                failed,
                source: Box::new(source),
            }),
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Runs kernels on single pieces and isolates their failures.
///
/// An error or panic in one piece is recorded and never stops sibling pieces.
pub struct KernelInvoker<'r> {
    progress: ProgressAggregator<'r>,
    failures: FailureLog,
    telemetry: Arc<dyn WorkerTelemetry>,
}

impl<'r> KernelInvoker<'r> {
    pub fn new(control: &'r dyn ExecutionControl, telemetry: Arc<dyn WorkerTelemetry>) -> Self {
        Self {
            progress: ProgressAggregator::new(control),
            failures: FailureLog::new(),
            telemetry,
        }
    }

    pub fn progress(&self) -> &ProgressAggregator<'r> {
        &self.progress
    }

    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }

    pub fn into_failures(self) -> FailureLog {
        self.failures
    }

    pub fn telemetry(&self) -> &dyn WorkerTelemetry {
        self.telemetry.as_ref()
    }

    pub fn invoke<K>(&self, item: WorkItem, kernel: &K) -> PieceOutcome
    where
        K: Fn(&PieceContext<'_>) -> Result<()> + ?Sized,
    {
        self.telemetry.on_piece_started(item.thread_id, item.piece);
        let started_at = Instant::now();

        let context = PieceContext {
            item,
            progress: &self.progress,
        };
        let result = match catch_unwind(AssertUnwindSafe(|| kernel(&context))) {
            Ok(result) => result,
            Err(payload) => Err(TesselError::KernelPanicked(panic_message(payload.as_ref()))),
        };

        let elapsed = started_at.elapsed();
        match result {
            Ok(()) => {
                self.telemetry
                    .on_piece_finished(item.thread_id, item.piece, elapsed);
                PieceOutcome::Completed(elapsed)
            }
            Err(error) => {
                self.telemetry
                    .on_piece_failed(item.thread_id, item.piece, elapsed);
                self.failures.record(item.piece, error);
                PieceOutcome::Failed(elapsed)
            }
        }
    }
}
