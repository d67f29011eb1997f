use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{CasError, Result, Stage};

/// Cooperative cancellation flag shared between a caller and a parse.
///
/// Cloning shares the flag. The parser polls it between stages only, so a
/// stage that has started always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` if the flag is set before `stage` starts.
    pub fn check(&self, stage: Stage) -> Result<()> {
        if self.is_cancelled() {
            Err(CasError::Cancelled { stage })
        } else {
            Ok(())
        }
    }
}
