use std::sync::Arc;

use crate::buffer::{PieceWriter, Volume};
use crate::config::{DispatchOptions, DispatchStrategy};
use crate::core::control::{ExecutionControl, NoControl};
use crate::core::invoker::{KernelInvoker, PieceContext};
use crate::core::state::RunState;
use crate::core::{dynamic, fixed};
use crate::error::TesselError;
use crate::telemetry::events::{DispatchStartedEvent, TelemetryEvent, emit_global};
use crate::telemetry::profile;
use crate::telemetry::report::{DispatchReport, WorkerReport};
use crate::telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
use crate::telemetry::{self, tags};
use crate::types::{Extent, Result, duration_to_us};

const PROFILE_TAG_STACK_DISPATCH: [&str; 2] = [tags::TAG_SYSTEM, tags::TAG_DISPATCH];
const PROFILE_TAG_STACK_SPLIT: [&str; 2] = [tags::TAG_SYSTEM, tags::TAG_SPLIT];

/// Splits a whole extent into pieces and runs a kernel on each in parallel.
///
/// Pieces of one run never overlap and together cover the whole extent, so
/// kernels may write into one shared output without locks.
pub struct Dispatcher {
    options: DispatchOptions,
    telemetry: Arc<dyn WorkerTelemetry>,
}

impl Dispatcher {
    /// Creates a dispatcher using the default worker telemetry implementation.
    pub fn new(options: DispatchOptions) -> Self {
        Self::with_telemetry(options, Arc::new(DefaultWorkerTelemetry))
    }

    /// Creates a dispatcher with a custom telemetry backend.
    pub fn with_telemetry(options: DispatchOptions, telemetry: Arc<dyn WorkerTelemetry>) -> Self {
        Self { options, telemetry }
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    pub fn strategy(&self) -> DispatchStrategy {
        self.options.strategy()
    }

    /// Runs `kernel` once per piece of `whole`.
    pub fn run<K>(&self, whole: Extent, kernel: K) -> Result<DispatchReport>
    where
        K: Fn(&PieceContext<'_>) -> Result<()> + Sync,
    {
        self.run_with_control(whole, &NoControl, kernel)
    }

    /// Runs `kernel` once per piece, reporting progress to and polling
    /// cancellation from `control`.
    ///
    /// Every dispatched piece runs to completion even when others fail; the
    /// lowest-index failure is returned once all of them have finished.
    pub fn run_with_control<K>(
        &self,
        whole: Extent,
        control: &dyn ExecutionControl,
        kernel: K,
    ) -> Result<DispatchReport>
    where
        K: Fn(&PieceContext<'_>) -> Result<()> + Sync,
    {
        let strategy = self.options.strategy();
        if whole.is_empty() {
            return Ok(DispatchReport::empty(strategy, whole));
        }

        let invoker = KernelInvoker::new(control, Arc::clone(&self.telemetry));
        let (requested, total, state) = match strategy {
            DispatchStrategy::FixedThreads => {
                let plan = fixed::FixedPlan::new(&whole, &self.options);
                self.announce(strategy, whole, plan.requested, plan.total, plan.workers);
                let state = RunState::new(plan.workers);
                fixed::run(
                    &whole,
                    &self.options,
                    plan,
                    &invoker,
                    control,
                    &state,
                    &kernel,
                );
                (plan.requested, plan.total, state)
            }
            DispatchStrategy::DynamicRange => {
                let pool = dynamic::DynamicPool::for_options(&self.options)?;
                let plan = dynamic::DynamicPlan::new(&whole, &self.options, pool.num_threads());
                self.announce(strategy, whole, plan.requested, plan.total, pool.num_threads());
                let state = RunState::new(pool.num_threads());
                dynamic::run(
                    &whole,
                    &self.options,
                    plan,
                    &pool,
                    &invoker,
                    control,
                    &state,
                    &kernel,
                );
                (plan.requested, plan.total, state)
            }
        };

        let aborted = state.skipped() > 0;
        if !aborted {
            invoker.progress().complete();
        }

        let report = DispatchReport {
            strategy,
            whole,
            pieces_requested: requested,
            pieces_total: total,
            pieces_completed: state.completed(),
            pieces_failed: state.failed(),
            pieces_skipped: state.skipped(),
            aborted,
            elapsed: state.elapsed(),
            workers: state
                .worker_snapshots()
                .iter()
                .map(WorkerReport::from_runtime)
                .collect(),
            telemetry: None,
        };
        self.finish(&report);

        invoker.into_failures().into_result()?;
        Ok(report)
    }

    /// Runs `kernel` with a read-only input volume and a disjoint writer over
    /// the matching piece of `output`.
    ///
    /// `output` must cover `whole`. Input samples outside a piece stay
    /// readable; requesting enough of them is the caller's concern.
    pub fn run_with_output<I, O, K>(
        &self,
        whole: Extent,
        input: &Volume<I>,
        output: &mut Volume<O>,
        control: &dyn ExecutionControl,
        kernel: K,
    ) -> Result<DispatchReport>
    where
        I: Sync,
        O: Send,
        K: Fn(&PieceContext<'_>, &Volume<I>, &mut PieceWriter<'_, O>) -> Result<()> + Sync,
    {
        ensure_covers(&whole, &output.extent(), "output")?;

        let shared = output.shared_output();
        self.run_with_control(whole, control, |context| {
            // SAFETY: every context of one run carries a distinct piece of the
            // same decomposition of `whole`, which `shared` covers, and those
            // pieces are pairwise disjoint.
            let mut writer = unsafe { shared.piece_writer(context.extent()) };
            kernel(context, input, &mut writer)
        })
    }

    /// Multi-port form of [`Self::run_with_output`]: the kernel sees every
    /// input volume and one writer per output, each restricted to the piece.
    ///
    /// Every output must cover `whole`; writers are passed in `outputs` order.
    pub fn run_with_views<I, O, K>(
        &self,
        whole: Extent,
        inputs: &[&Volume<I>],
        outputs: &mut [&mut Volume<O>],
        control: &dyn ExecutionControl,
        kernel: K,
    ) -> Result<DispatchReport>
    where
        I: Sync,
        O: Send,
        K: Fn(&PieceContext<'_>, &[&Volume<I>], &mut [PieceWriter<'_, O>]) -> Result<()> + Sync,
    {
        for (port, output) in outputs.iter().enumerate() {
            ensure_covers(&whole, &output.extent(), &format!("output {port}"))?;
        }

        let shared: Vec<_> = outputs
            .iter_mut()
            .map(|output| output.shared_output())
            .collect();
        self.run_with_control(whole, control, |context| {
            let mut writers: Vec<_> = shared
                .iter()
                // SAFETY: as in `run_with_output`, applied per output; writers
                // of different outputs never share a buffer.
                .map(|output| unsafe { output.piece_writer(context.extent()) })
                .collect();
            kernel(context, inputs, &mut writers)
        })
    }

    fn announce(
        &self,
        strategy: DispatchStrategy,
        whole: Extent,
        requested: usize,
        total: usize,
        workers: usize,
    ) {
        telemetry::increment_counter(
            tags::METRIC_DISPATCH_RUN_COUNT,
            1,
            &[("subsystem", "dispatch"), ("op", "run")],
        );
        telemetry::record_histogram(
            tags::METRIC_DISPATCH_PIECES,
            total as u64,
            &[("subsystem", "dispatch"), ("op", "run")],
        );

        profile::event(
            tags::PROFILE_SPLIT,
            &PROFILE_TAG_STACK_SPLIT,
            "plan",
            if total < requested { "clamped" } else { "ok" },
            0,
            "decomposition planned",
        );

        emit_global(TelemetryEvent::DispatchStarted(DispatchStartedEvent {
            strategy,
            whole,
            pieces_requested: requested,
            pieces_total: total,
            workers,
        }));
    }

    fn finish(&self, report: &DispatchReport) {
        let elapsed_us = duration_to_us(report.elapsed);
        telemetry::record_histogram(
            tags::METRIC_DISPATCH_LATENCY_US,
            elapsed_us,
            &[("subsystem", "dispatch"), ("op", "run")],
        );
        if report.aborted {
            telemetry::increment_counter(
                tags::METRIC_DISPATCH_ABORT_COUNT,
                1,
                &[("subsystem", "dispatch"), ("op", "abort")],
            );
        }

        profile::event(
            tags::PROFILE_DISPATCH,
            &PROFILE_TAG_STACK_DISPATCH,
            "run",
            if report.pieces_failed > 0 { "error" } else { "ok" },
            elapsed_us,
            "dispatch run finished",
        );

        emit_global(TelemetryEvent::DispatchCompleted(report.clone()));
    }
}

fn ensure_covers(whole: &Extent, view: &Extent, label: &str) -> Result<()> {
    if view.contains(whole) {
        return Ok(());
    }
    Err(TesselError::InvalidView(format!(
        "{label} extent {view} does not cover dispatch extent {whole}"
    )))
}
