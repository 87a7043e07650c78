//! Leader-only coarse progress reporting.
//!
//! Only the leader worker (thread 0 for fixed dispatch, the worker running
//! piece 0 for dynamic dispatch) ever writes the progress value. Every other
//! worker's call is a no-op, so reporting never contends. The decomposition is
//! near-uniform, which makes the leader's local progress a usable proxy for
//! the whole run.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::control::ExecutionControl;
use crate::types::WorkItem;

/// Approximate number of progress updates published per run.
pub const PROGRESS_STEPS: u64 = 50;

pub struct ProgressAggregator<'a> {
    control: &'a dyn ExecutionControl,
    /// `f64` bits of the last published fraction.
    published: AtomicU64,
}

impl<'a> ProgressAggregator<'a> {
    pub fn new(control: &'a dyn ExecutionControl) -> Self {
        Self {
            control,
            published: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Last fraction forwarded to the control.
    pub fn last_fraction(&self) -> f64 {
        f64::from_bits(self.published.load(Ordering::Acquire))
    }

    /// Reports that the calling worker finished `local_done` of the
    /// `local_total` pieces it owns.
    ///
    /// Publishes only while the leader still has pieces left in its range, so
    /// it is silent for a worker owning a single piece. Fixed dispatch never
    /// spawns more workers than pieces, so each worker owns exactly one;
    /// dynamic dispatch has no owned range at all. In both cases run-time
    /// progress comes from [`RowTicker`], and completion is left to
    /// [`Self::complete`].
    pub fn report(&self, item: &WorkItem, local_done: usize, local_total: usize) {
        if !item.leader || local_done >= local_total {
            return;
        }
        self.publish(local_done as f64 / local_total as f64);
    }

    /// Intra-piece ticker for row loops inside a kernel.
    pub fn row_ticker(&self, item: &WorkItem, rows: u64) -> RowTicker<'_, 'a> {
        RowTicker {
            aggregator: item.leader.then_some(self),
            target: rows / PROGRESS_STEPS + 1,
            count: 0,
        }
    }

    /// Publishes completion after every worker has joined.
    pub(crate) fn complete(&self) {
        self.publish(1.0);
    }

    fn publish(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        let last = self.last_fraction();
        let step = (fraction * PROGRESS_STEPS as f64).floor();
        let last_step = (last * PROGRESS_STEPS as f64).floor();

        if step > last_step || (fraction >= 1.0 && last < 1.0) {
            self.published.store(fraction.to_bits(), Ordering::Release);
            self.control.update_progress(fraction);
        }
    }
}

/// Counts rows processed by the leader and publishes roughly
/// [`PROGRESS_STEPS`] updates across them.
pub struct RowTicker<'p, 'a> {
    aggregator: Option<&'p ProgressAggregator<'a>>,
    target: u64,
    count: u64,
}

impl RowTicker<'_, '_> {
    pub fn tick(&mut self) {
        if let Some(aggregator) = self.aggregator {
            if self.count % self.target == 0 {
                aggregator.publish(self.count as f64 / (PROGRESS_STEPS * self.target) as f64);
            }
        }
        self.count += 1;
    }

    pub fn is_active(&self) -> bool {
        self.aggregator.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::types::Extent;

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<f64>>,
    }

    impl ExecutionControl for Recorder {
        fn update_progress(&self, fraction: f64) {
            self.updates.lock().expect("recorder lock poisoned").push(fraction);
        }
    }

    fn item(leader: bool) -> WorkItem {
        WorkItem::new(0, Extent::new(0, 0, 0, 0, 0, 0), 0, leader)
    }

    #[test]
    fn followers_never_publish() {
        let recorder = Recorder::default();
        let progress = ProgressAggregator::new(&recorder);

        progress.report(&item(false), 1, 2);
        progress.row_ticker(&item(false), 10).tick();

        assert!(recorder.updates.lock().expect("recorder lock poisoned").is_empty());
        assert_eq!(progress.last_fraction(), 0.0);
    }

    #[test]
    fn single_piece_range_is_silent() {
        let recorder = Recorder::default();
        let progress = ProgressAggregator::new(&recorder);

        progress.report(&item(true), 1, 1);

        assert!(recorder.updates.lock().expect("recorder lock poisoned").is_empty());
        assert_eq!(progress.last_fraction(), 0.0);
    }

    #[test]
    fn leader_range_completion_waits_for_dispatcher() {
        let recorder = Recorder::default();
        let progress = ProgressAggregator::new(&recorder);

        progress.report(&item(true), 1, 2);
        progress.report(&item(true), 2, 2);
        assert_eq!(progress.last_fraction(), 0.5);

        progress.complete();
        let updates = recorder.updates.lock().expect("recorder lock poisoned");
        assert_eq!(*updates, vec![0.5, 1.0]);
    }

    #[test]
    fn row_ticker_caps_update_count() {
        let recorder = Recorder::default();
        let progress = ProgressAggregator::new(&recorder);
        let mut ticker = progress.row_ticker(&item(true), 10_000);

        for _ in 0..10_000 {
            ticker.tick();
        }

        let updates = recorder.updates.lock().expect("recorder lock poisoned");
        assert!(updates.len() <= PROGRESS_STEPS as usize + 1);
        assert!(updates.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
