//! Cooperative cancellation (spec.md §5).
//!
//! A [`CancelToken`] is checked between blocks by the compression
//! pipeline and on every `read`/`seek` by the seekable decompressor —
//! never mid-block, since a single block's codec call cannot be
//! interrupted without corrupting its framing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::EngineError;

#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `Err(EngineError::Cancelled)` if cancellation was
    /// requested, otherwise `Ok(())`. Callers sprinkle this between
    /// block-sized units of work.
    pub fn check(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
