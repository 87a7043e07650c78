pub mod control;
pub mod dispatcher;
pub(crate) mod dynamic;
pub(crate) mod fixed;
pub mod invoker;
pub mod progress;
pub(crate) mod state;

pub use control::{AbortFlag, CallbackControl, ExecutionControl, NoControl};
pub use dispatcher::Dispatcher;
pub use invoker::{FailureLog, KernelInvoker, PieceContext, PieceOutcome};
pub use progress::{PROGRESS_STEPS, ProgressAggregator, RowTicker};
pub use state::WorkerRuntimeSnapshot;
