use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag for blocking waits.
///
/// All copies of a token share the same state. Once cancelled, a token stays cancelled: every
/// wait that observes it returns at its next poll.
///
/// # Usage
///
/// ```rust
/// use mavctl::io::CancelToken;
///
/// let token = CancelToken::new();
/// let shared = token.clone();
/// assert!(!shared.is_cancelled());
///
/// token.cancel();
/// assert!(shared.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token which is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels all waits that observe this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` if token was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
