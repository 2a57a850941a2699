use crate::error::{IconError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

//===========================================================================//

/// A cooperative cancellation flag.  Clones share the same flag, so one clone
/// can be handed to a worker while another stays with the caller.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    /// Requests cancellation.  Long-running operations observe this at their
    /// next checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once `cancel` has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns `Err(IconError::Cancelled)` if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            tracing::debug!("cancellation observed");
            return Err(IconError::Cancelled);
        }
        Ok(())
    }
}

//===========================================================================//


//===========================================================================//
