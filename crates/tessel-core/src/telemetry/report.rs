use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::DispatchStrategy;
use crate::core::WorkerRuntimeSnapshot;
use crate::telemetry::{self, TelemetrySnapshot};
use crate::types::Extent;

/// Per-worker activity over one dispatch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Pieces this worker handed to the kernel, failed ones included.
    pub pieces_processed: usize,
    pub uptime: Duration,
    pub busy: Duration,
    pub idle: Duration,
    /// Busy time over uptime, in `0.0..=1.0`.
    pub utilization: f64,
}

impl WorkerReport {
    pub fn from_runtime(runtime: &WorkerRuntimeSnapshot) -> Self {
        Self {
            worker_id: runtime.worker_id,
            pieces_processed: runtime.pieces_processed,
            uptime: runtime.uptime,
            busy: runtime.busy,
            idle: runtime.idle,
            utilization: runtime.utilization,
        }
    }
}

/// Summary of one dispatch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub strategy: DispatchStrategy,
    pub whole: Extent,
    /// Piece count asked of the splitter.
    pub pieces_requested: usize,
    /// Piece count the splitter actually produced.
    pub pieces_total: usize,
    pub pieces_completed: usize,
    pub pieces_failed: usize,
    /// Pieces never started because cancellation was observed first.
    pub pieces_skipped: usize,
    pub aborted: bool,
    pub elapsed: Duration,
    pub workers: Vec<WorkerReport>,
    pub telemetry: Option<TelemetrySnapshot>,
}

impl DispatchReport {
    /// Report for a run over an empty extent; no kernel was invoked.
    pub fn empty(strategy: DispatchStrategy, whole: Extent) -> Self {
        Self {
            strategy,
            whole,
            pieces_requested: 0,
            pieces_total: 0,
            pieces_completed: 0,
            pieces_failed: 0,
            pieces_skipped: 0,
            aborted: false,
            elapsed: Duration::ZERO,
            workers: Vec::new(),
            telemetry: None,
        }
    }

    /// Attaches a snapshot of the metric registry when asked to.
    pub fn with_telemetry_snapshot(mut self, include: bool) -> Self {
        self.telemetry = include.then(telemetry::snapshot);
        self
    }

    /// True when every produced piece ran to completion without error.
    pub fn is_complete(&self) -> bool {
        self.pieces_completed == self.pieces_total && self.pieces_failed == 0 && !self.aborted
    }

    /// Mean worker utilization, or 0 when no worker started.
    pub fn mean_utilization(&self) -> f64 {
        if self.workers.is_empty() {
            return 0.0;
        }
        self.workers.iter().map(|w| w.utilization).sum::<f64>() / self.workers.len() as f64
    }
}
