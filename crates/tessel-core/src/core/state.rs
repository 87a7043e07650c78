use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::core::invoker::PieceOutcome;
use crate::types::duration_to_us;

/// Per-run counters shared by the workers of one dispatch.
///
/// These are bookkeeping only; output writes never go through here.
pub(crate) struct RunState {
    started_at: Instant,
    completed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    piece_counts: Vec<AtomicUsize>,
    worker_started_offsets_us: Vec<AtomicU64>,
    worker_stopped_offsets_us: Vec<AtomicU64>,
    worker_busy_us: Vec<AtomicU64>,
}

impl RunState {
    pub(crate) fn new(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        Self {
            started_at: Instant::now(),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            piece_counts: (0..num_workers).map(|_| AtomicUsize::new(0)).collect(),
            worker_started_offsets_us: (0..num_workers).map(|_| AtomicU64::new(0)).collect(),
            worker_stopped_offsets_us: (0..num_workers).map(|_| AtomicU64::new(0)).collect(),
            worker_busy_us: (0..num_workers).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn slot(&self, worker_id: usize) -> usize {
        worker_id.min(self.piece_counts.len() - 1)
    }

    fn now_offset_us(&self) -> u64 {
        duration_to_us(self.started_at.elapsed()).saturating_add(1)
    }

    /// Marks the first activity of `worker_id`; later calls are ignored.
    pub(crate) fn worker_started(&self, worker_id: usize) {
        let slot = self.slot(worker_id);
        let _ = self.worker_started_offsets_us[slot].compare_exchange(
            0,
            self.now_offset_us(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub(crate) fn worker_stopped(&self, worker_id: usize) {
        let slot = self.slot(worker_id);
        self.worker_stopped_offsets_us[slot].fetch_max(self.now_offset_us(), Ordering::AcqRel);
    }

    pub(crate) fn record(&self, worker_id: usize, outcome: PieceOutcome) {
        let slot = self.slot(worker_id);
        self.worker_busy_us[slot].fetch_add(duration_to_us(outcome.elapsed()), Ordering::AcqRel);
        self.piece_counts[slot].fetch_add(1, Ordering::AcqRel);
        if outcome.is_failure() {
            self.failed.fetch_add(1, Ordering::AcqRel);
        } else {
            self.completed.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub(crate) fn skip(&self, count: usize) {
        self.skipped.fetch_add(count, Ordering::AcqRel);
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub(crate) fn failed(&self) -> usize {
        self.failed.load(Ordering::Acquire)
    }

    pub(crate) fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Acquire)
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Snapshots every worker slot that processed at least one piece.
    pub(crate) fn worker_snapshots(&self) -> Vec<WorkerRuntimeSnapshot> {
        let elapsed_us = duration_to_us(self.started_at.elapsed());
        let mut workers = Vec::with_capacity(self.piece_counts.len());

        for worker_id in 0..self.piece_counts.len() {
            let started_raw = self.worker_started_offsets_us[worker_id].load(Ordering::Acquire);
            if started_raw == 0 {
                continue;
            }
            let stopped_raw = self.worker_stopped_offsets_us[worker_id].load(Ordering::Acquire);
            let busy_raw = self.worker_busy_us[worker_id].load(Ordering::Acquire);

            let start_us = started_raw.saturating_sub(1);
            let stop_us = if stopped_raw == 0 {
                elapsed_us
            } else {
                stopped_raw.saturating_sub(1)
            };
            let uptime_us = stop_us.saturating_sub(start_us);
            let busy_us = busy_raw.min(uptime_us);
            let idle_us = uptime_us.saturating_sub(busy_us);
            let utilization = if uptime_us == 0 {
                0.0
            } else {
                busy_us as f64 / uptime_us as f64
            };

            workers.push(WorkerRuntimeSnapshot {
                worker_id,
                pieces_processed: self.piece_counts[worker_id].load(Ordering::Acquire),
                uptime: Duration::from_micros(uptime_us),
                busy: Duration::from_micros(busy_us),
                idle: Duration::from_micros(idle_us),
                utilization,
            });
        }

        workers
    }
}

/// Per-worker runtime metrics captured during a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerRuntimeSnapshot {
    pub worker_id: usize,
    pub pieces_processed: usize,
    pub uptime: Duration,
    pub busy: Duration,
    pub idle: Duration,
    pub utilization: f64,
}
