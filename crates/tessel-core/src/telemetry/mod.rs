//! Metrics, profiling events and run reports.
//!
//! The metric registry is compiled in with the `telemetry` feature; without it
//! every recording call is a no-op and [`snapshot`] is empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod events;
pub mod profile;
pub mod report;
pub mod tags;
pub mod worker;

pub use events::{DispatchStartedEvent, GlobalTelemetrySink, ProfileEvent, TelemetryEvent};
pub use report::{DispatchReport, WorkerReport};

/// Summary of one histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub total: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
}

/// Point-in-time copy of every recorded metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, u64>,
    pub histograms: BTreeMap<String, HistogramSnapshot>,
}

impl TelemetrySnapshot {
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    pub fn gauge(&self, name: &str) -> Option<u64> {
        self.gauges.get(name).copied()
    }

    pub fn histogram(&self, name: &str) -> Option<HistogramSnapshot> {
        self.histograms.get(name).copied()
    }
}

/// Adds `value` to a counter. Labels are accepted for call-site readability
/// and are not stored.
#[inline]
pub fn increment_counter(name: &'static str, value: u64, _labels: &[(&str, &str)]) {
    #[cfg(feature = "telemetry")]
    registry::update(|store| {
        let counter = store.counters.entry(name).or_insert(0);
        *counter = counter.saturating_add(value);
    });

    let _ = (name, value);
}

#[inline]
pub fn record_histogram(name: &'static str, value: u64, _labels: &[(&str, &str)]) {
    #[cfg(feature = "telemetry")]
    registry::update(|store| store.histograms.entry(name).or_default().record(value));

    let _ = (name, value);
}

#[inline]
pub fn add_gauge(name: &'static str, delta: u64, _labels: &[(&str, &str)]) {
    #[cfg(feature = "telemetry")]
    registry::update(|store| {
        let gauge = store.gauges.entry(name).or_insert(0);
        *gauge = gauge.saturating_add(delta);
    });

    let _ = (name, delta);
}

/// Subtracts `delta` from a gauge, flooring at zero.
#[inline]
pub fn sub_gauge_saturating(name: &'static str, delta: u64, _labels: &[(&str, &str)]) {
    #[cfg(feature = "telemetry")]
    registry::update(|store| {
        let gauge = store.gauges.entry(name).or_insert(0);
        *gauge = gauge.saturating_sub(delta);
    });

    let _ = (name, delta);
}

pub fn snapshot() -> TelemetrySnapshot {
    #[cfg(feature = "telemetry")]
    {
        registry::snapshot()
    }

    #[cfg(not(feature = "telemetry"))]
    {
        TelemetrySnapshot::default()
    }
}

/// Clears every recorded metric.
pub fn reset() {
    #[cfg(feature = "telemetry")]
    registry::update(|store| *store = registry::Store::default());
}

#[cfg(feature = "telemetry")]
mod registry {
    use std::collections::BTreeMap;
    use std::sync::{Mutex, OnceLock};

    use super::{HistogramSnapshot, TelemetrySnapshot};

    #[derive(Debug, Clone, Copy, Default)]
    pub(super) struct Histogram {
        count: u64,
        total: u64,
        min: u64,
        max: u64,
    }

    impl Histogram {
        pub(super) fn record(&mut self, value: u64) {
            self.min = if self.count == 0 { value } else { self.min.min(value) };
            self.max = self.max.max(value);
            self.count = self.count.saturating_add(1);
            self.total = self.total.saturating_add(value);
        }

        fn snapshot(&self) -> HistogramSnapshot {
            HistogramSnapshot {
                count: self.count,
                total: self.total,
                min: self.min,
                max: self.max,
                mean: if self.count == 0 {
                    0.0
                } else {
                    self.total as f64 / self.count as f64
                },
            }
        }
    }

    #[derive(Default)]
    pub(super) struct Store {
        pub(super) counters: BTreeMap<&'static str, u64>,
        pub(super) gauges: BTreeMap<&'static str, u64>,
        pub(super) histograms: BTreeMap<&'static str, Histogram>,
    }

    fn store() -> &'static Mutex<Store> {
        static STORE: OnceLock<Mutex<Store>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(Store::default()))
    }

    pub(super) fn update<F: FnOnce(&mut Store)>(op: F) {
        let mut guard = match store().lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        op(&mut guard);
    }

    pub(super) fn snapshot() -> TelemetrySnapshot {
        let mut snapshot = TelemetrySnapshot::default();
        update(|store| {
            snapshot.counters = store
                .counters
                .iter()
                .map(|(name, value)| ((*name).to_owned(), *value))
                .collect();
            snapshot.gauges = store
                .gauges
                .iter()
                .map(|(name, value)| ((*name).to_owned(), *value))
                .collect();
            snapshot.histograms = store
                .histograms
                .iter()
                .map(|(name, histogram)| ((*name).to_owned(), histogram.snapshot()))
                .collect();
        });
        snapshot
    }
}
