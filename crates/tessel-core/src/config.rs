use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::split::SplitConfig;
use crate::types::Extent;

/// Upper bound on threads spawned by fixed-thread dispatch.
pub const MAX_THREADS: usize = 64;

/// Default size hint for one dynamically scheduled piece.
pub const DEFAULT_DESIRED_BYTES_PER_PIECE: u64 = 65_536;

static GLOBAL_DEFAULT_ENABLE_SMP: AtomicBool = AtomicBool::new(true);

/// Sets the process-wide default used by options that leave `enable_smp` unset.
///
/// Meant to be called once at start-up.
pub fn set_global_default_enable_smp(enabled: bool) {
    GLOBAL_DEFAULT_ENABLE_SMP.store(enabled, Ordering::Release);
}

pub fn global_default_enable_smp() -> bool {
    GLOBAL_DEFAULT_ENABLE_SMP.load(Ordering::Acquire)
}

/// Scheduling strategy resolved for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchStrategy {
    /// One OS thread per contiguous range of pieces.
    FixedThreads,
    /// Work-stealing parallel-for over the piece range.
    DynamicRange,
}

/// Per-run knobs for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOptions {
    /// Decomposition policy.
    pub split: SplitConfig,
    /// Use dynamic dispatch; `None` defers to the process-wide default.
    pub enable_smp: Option<bool>,
    /// Worker threads for fixed dispatch; ignored when dynamic dispatch is
    /// selected.
    pub number_of_threads: usize,
    /// Size of a dedicated pool for dynamic dispatch. `None` runs on the
    /// shared rayon pool.
    #[serde(default)]
    pub dynamic_pool_threads: Option<usize>,
    /// Target payload per dynamically scheduled piece; zero means one piece
    /// per pool thread.
    pub desired_bytes_per_piece: u64,
    /// Bytes per sample of the output, used for the dynamic estimate.
    pub bytes_per_sample: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            split: SplitConfig::default(),
            enable_smp: None,
            number_of_threads: default_thread_count(),
            dynamic_pool_threads: None,
            desired_bytes_per_piece: DEFAULT_DESIRED_BYTES_PER_PIECE,
            bytes_per_sample: 1,
        }
    }
}

impl DispatchOptions {
    /// Fixed-thread options with `threads` workers.
    pub fn fixed(threads: usize) -> Self {
        Self {
            enable_smp: Some(false),
            number_of_threads: threads,
            ..Self::default()
        }
    }

    /// Dynamic options using the shared rayon pool.
    pub fn dynamic() -> Self {
        Self {
            enable_smp: Some(true),
            ..Self::default()
        }
    }

    /// Runs dynamic dispatch on a dedicated pool of `threads` workers.
    pub fn with_dynamic_pool_threads(mut self, threads: usize) -> Self {
        self.dynamic_pool_threads = Some(threads);
        self
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_desired_bytes_per_piece(mut self, bytes: u64) -> Self {
        self.desired_bytes_per_piece = bytes;
        self
    }

    pub fn with_bytes_per_sample(mut self, bytes: usize) -> Self {
        self.bytes_per_sample = bytes;
        self
    }

    pub fn strategy(&self) -> DispatchStrategy {
        if self.enable_smp.unwrap_or_else(global_default_enable_smp) {
            DispatchStrategy::DynamicRange
        } else {
            DispatchStrategy::FixedThreads
        }
    }

    /// Thread count clamped to `[1, MAX_THREADS]`.
    pub fn clamped_threads(&self) -> usize {
        clamp_threads(self.number_of_threads)
    }

    /// Initial piece-count estimate for dynamic dispatch over `whole`.
    pub fn estimate_dynamic_pieces(&self, whole: &Extent, pool_threads: usize) -> usize {
        if self.desired_bytes_per_piece == 0 {
            return pool_threads.max(1);
        }

        let bytes = whole
            .num_samples()
            .saturating_mul(self.bytes_per_sample.max(1) as u64);
        let pieces = bytes.div_ceil(self.desired_bytes_per_piece);
        pieces.clamp(1, usize::MAX as u64) as usize
    }
}

pub fn clamp_threads(requested: usize) -> usize {
    requested.clamp(1, MAX_THREADS)
}

fn default_thread_count() -> usize {
    num_cpus::get().clamp(1, MAX_THREADS)
}
