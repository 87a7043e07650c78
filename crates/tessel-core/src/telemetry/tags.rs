/// Profiling target for decomposition.
pub const PROFILE_SPLIT: &str = "tessel.profile.split";
/// Profiling target for dispatch runs.
pub const PROFILE_DISPATCH: &str = "tessel.profile.dispatch";
/// Profiling target for per-piece worker activity.
pub const PROFILE_WORKER: &str = "tessel.profile.worker";

/// Global system-level tag shared by all profiling events.
pub const TAG_SYSTEM: &str = "system";
pub const TAG_SPLIT: &str = "split";
pub const TAG_DISPATCH: &str = "dispatch";
pub const TAG_WORKER: &str = "worker";

pub const METRIC_DISPATCH_RUN_COUNT: &str = "tessel.dispatch.run.count";
pub const METRIC_DISPATCH_ABORT_COUNT: &str = "tessel.dispatch.abort.count";
pub const METRIC_DISPATCH_PIECES: &str = "tessel.dispatch.pieces";
pub const METRIC_DISPATCH_LATENCY_US: &str = "tessel.dispatch.latency_us";

pub const METRIC_WORKER_PIECE_START_COUNT: &str = "tessel.worker.piece.start.count";
pub const METRIC_WORKER_PIECE_FINISH_COUNT: &str = "tessel.worker.piece.finish.count";
pub const METRIC_WORKER_PIECE_FAIL_COUNT: &str = "tessel.worker.piece.fail.count";
pub const METRIC_WORKER_PIECE_SKIP_COUNT: &str = "tessel.worker.piece.skip.count";
pub const METRIC_WORKER_PIECE_LATENCY_US: &str = "tessel.worker.piece.latency_us";
pub const METRIC_WORKER_ACTIVE_COUNT: &str = "tessel.worker.active.count";
