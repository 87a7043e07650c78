use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::config::DispatchStrategy;
use crate::types::Extent;

use super::report::DispatchReport;

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchStartedEvent {
    pub strategy: DispatchStrategy,
    pub whole: Extent,
    pub pieces_requested: usize,
    pub pieces_total: usize,
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct ProfileEvent {
    pub target: &'static str,
    pub op: &'static str,
    pub result: &'static str,
    pub elapsed_us: u64,
    pub tags: Vec<String>,
    pub message: &'static str,
}

#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    DispatchStarted(DispatchStartedEvent),
    DispatchCompleted(DispatchReport),
    Profile(ProfileEvent),
}

/// Process-wide sink; must be `Send` because any worker may emit.
pub trait GlobalTelemetrySink: Send {
    fn on_event(&mut self, event: TelemetryEvent);
}

fn global_sink() -> MutexGuard<'static, Option<Box<dyn GlobalTelemetrySink>>> {
    static GLOBAL_SINK: OnceLock<Mutex<Option<Box<dyn GlobalTelemetrySink>>>> = OnceLock::new();
    let sink = GLOBAL_SINK.get_or_init(|| Mutex::new(None));
    match sink.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Registers the process-wide sink, replacing any previous one.
pub fn set_global_sink(sink: Option<Box<dyn GlobalTelemetrySink>>) {
    *global_sink() = sink;
}

/// Emits an event to the process-wide sink when one is registered.
pub fn emit_global(event: TelemetryEvent) {
    if let Some(sink) = global_sink().as_mut() {
        sink.on_event(event);
    }
}
