use thiserror::Error;

#[derive(Debug, Error)]
pub enum TesselError {
    #[error("kernel failed on piece {piece} ({failed} piece(s) failed): {source}")]
    KernelFailed {
        piece: usize,
        failed: usize,
        #[source]
        source: Box<TesselError>,
    },
    #[error("kernel panicked: {0}")]
    KernelPanicked(String),
    #[error("kernel error: {0}")]
    Kernel(String),
    #[error("invalid split path: {0}")]
    InvalidSplitPath(&'static str),
    #[error("invalid view: {0}")]
    InvalidView(String),
    #[error("thread pool error: {0}")]
    ThreadPool(String),
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<TesselError>,
    },
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TesselError {
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Piece index carried by a re-raised kernel failure.
    pub fn failed_piece(&self) -> Option<usize> {
        match self {
            Self::KernelFailed { piece, .. } => Some(*piece),
            Self::Context { source, .. } => source.failed_piece(),
            _ => None,
        }
    }
}

/// Renders a panic payload the way `std` prints it.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
