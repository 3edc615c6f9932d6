//! Platform abstraction for the resource runtime.
//!
//! The runtime never flushes on its own. Whenever an update is queued it asks
//! the host, through [`RuntimeScheduler`], to call [`crate::Runtime::flush`]
//! at its next opportunity (an event loop turn, a test step, a timer tick).

/// Tells the host that the runtime has pending work.
///
/// Implementations must be cheap and must not flush synchronously: setters
/// call into the scheduler from arbitrary places, including effect bodies.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host drain the runtime soon.
    fn schedule_flush(&self);
}
