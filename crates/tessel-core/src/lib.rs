//! Deterministic 3D extent decomposition and parallel piece dispatch.
//!
//! A whole extent is split into disjoint pieces by [`split_extent`], and a
//! [`Dispatcher`] runs a kernel once per piece on either a fixed set of OS
//! threads or a rayon work-stealing pool. Because pieces never overlap, every
//! kernel writes its own region of a shared output without locking.

pub mod buffer;
pub mod config;
pub mod core;
pub mod error;
pub mod split;
pub mod telemetry;
pub mod types;

pub use crate::core::{
    AbortFlag, CallbackControl, Dispatcher, ExecutionControl, NoControl, PieceContext,
    ProgressAggregator, RowTicker,
};
pub use buffer::{PieceWriter, SharedOutput, Volume};
pub use config::{DispatchOptions, DispatchStrategy, MAX_THREADS};
pub use error::TesselError;
pub use split::{PieceLayout, SplitConfig, SplitMode, SplitPath, split_extent};
pub use telemetry::report::{DispatchReport, WorkerReport};
pub use telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
pub use types::{Axis, Extent, Result, WorkItem};
