//! Progress reporting and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Progress callback for long-running exports
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send + Sync>;

/// Progress information during an export
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current phase
    pub phase: ExportPhase,
    /// Objects processed so far (written or skipped)
    pub objects_processed: usize,
    /// Objects to process
    pub total_objects: usize,
    /// Object about to be processed
    pub current_object: Option<String>,
}

impl ExportProgress {
    /// Calculate fraction complete (0.0 - 1.0)
    pub fn percentage(&self) -> f32 {
        if self.total_objects == 0 {
            1.0
        } else {
            self.objects_processed as f32 / self.total_objects as f32
        }
    }
}

/// Phases of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    /// Resolving the object list and instances
    Flattening,
    /// Writing object records
    Writing,
    /// Export complete
    Complete,
}

/// Shared flag checked between objects; set it to stop an export early
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag that is not yet cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
