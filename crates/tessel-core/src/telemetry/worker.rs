use std::time::Duration;

use crate::telemetry::{self, profile, tags};
use crate::types::duration_to_us;

const PROFILE_TAG_STACK_WORKER: [&str; 2] = [tags::TAG_SYSTEM, tags::TAG_WORKER];

/// Per-piece hooks called by the dispatcher on the worker that runs the piece.
///
/// Implementations must be cheap; they run inline on the hot path.
pub trait WorkerTelemetry: Send + Sync {
    fn on_piece_started(&self, worker_id: usize, piece: usize);
    fn on_piece_finished(&self, worker_id: usize, piece: usize, elapsed: Duration);
    fn on_piece_failed(&self, worker_id: usize, piece: usize, elapsed: Duration);
    /// Called for pieces never handed to the kernel because of an abort.
    fn on_piece_skipped(&self, worker_id: usize, piece: usize);
}

/// Records piece metrics into the process registry and emits profile events.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWorkerTelemetry;

impl DefaultWorkerTelemetry {
    fn piece_done(&self, result: &'static str, elapsed: Duration) {
        let elapsed_us = duration_to_us(elapsed);
        let labels = [("subsystem", "worker"), ("op", "piece"), ("result", result)];

        let counter = if result == "ok" {
            tags::METRIC_WORKER_PIECE_FINISH_COUNT
        } else {
            tags::METRIC_WORKER_PIECE_FAIL_COUNT
        };
        telemetry::increment_counter(counter, 1, &labels);
        telemetry::record_histogram(tags::METRIC_WORKER_PIECE_LATENCY_US, elapsed_us, &labels);
        telemetry::sub_gauge_saturating(tags::METRIC_WORKER_ACTIVE_COUNT, 1, &labels);

        profile::event(
            tags::PROFILE_WORKER,
            &PROFILE_TAG_STACK_WORKER,
            "piece_finish",
            result,
            elapsed_us,
            if result == "ok" {
                "piece finished"
            } else {
                "piece failed"
            },
        );
    }
}

impl WorkerTelemetry for DefaultWorkerTelemetry {
    fn on_piece_started(&self, _worker_id: usize, _piece: usize) {
        let labels = [("subsystem", "worker"), ("op", "piece_start")];
        telemetry::increment_counter(tags::METRIC_WORKER_PIECE_START_COUNT, 1, &labels);
        telemetry::add_gauge(tags::METRIC_WORKER_ACTIVE_COUNT, 1, &labels);

        profile::event(
            tags::PROFILE_WORKER,
            &PROFILE_TAG_STACK_WORKER,
            "piece_start",
            "ok",
            0,
            "piece started",
        );
    }

    fn on_piece_finished(&self, _worker_id: usize, _piece: usize, elapsed: Duration) {
        self.piece_done("ok", elapsed);
    }

    fn on_piece_failed(&self, _worker_id: usize, _piece: usize, elapsed: Duration) {
        self.piece_done("error", elapsed);
    }

    fn on_piece_skipped(&self, _worker_id: usize, _piece: usize) {
        telemetry::increment_counter(
            tags::METRIC_WORKER_PIECE_SKIP_COUNT,
            1,
            &[("subsystem", "worker"), ("op", "piece_skip")],
        );

        profile::event(
            tags::PROFILE_WORKER,
            &PROFILE_TAG_STACK_WORKER,
            "piece_skip",
            "aborted",
            0,
            "piece skipped after abort",
        );
    }
}
