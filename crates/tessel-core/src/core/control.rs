use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Callbacks a dispatch run exposes to the surrounding pipeline.
///
/// `update_progress` is only ever called from the leader worker.
/// `abort_requested` is polled between pieces, never inside a kernel.
pub trait ExecutionControl: Send + Sync {
    fn update_progress(&self, _fraction: f64) {}

    fn abort_requested(&self) -> bool {
        false
    }
}

/// Control that never aborts and drops progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoControl;

impl ExecutionControl for NoControl {}

/// Shareable abort flag.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag {
    flag: Arc<AtomicBool>,
}

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl ExecutionControl for AbortFlag {
    fn abort_requested(&self) -> bool {
        self.is_set()
    }
}

/// Adapts a progress closure and an abort flag into an [`ExecutionControl`].
pub struct CallbackControl<F> {
    on_progress: F,
    abort: AbortFlag,
}

impl<F> CallbackControl<F>
where
    F: Fn(f64) + Send + Sync,
{
    pub fn new(on_progress: F) -> Self {
        Self {
            on_progress,
            abort: AbortFlag::new(),
        }
    }

    pub fn with_abort(on_progress: F, abort: AbortFlag) -> Self {
        Self { on_progress, abort }
    }

    pub fn abort_flag(&self) -> &AbortFlag {
        &self.abort
    }
}

impl<F> ExecutionControl for CallbackControl<F>
where
    F: Fn(f64) + Send + Sync,
{
    fn update_progress(&self, fraction: f64) {
        (self.on_progress)(fraction);
    }

    fn abort_requested(&self) -> bool {
        self.abort.is_set()
    }
}
