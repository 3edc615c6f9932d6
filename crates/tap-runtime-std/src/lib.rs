//! Standard runtime services backed by Rust's `std` library.
//!
//! [`StdScheduler`] records that the runtime has work pending and optionally
//! wakes the host loop. [`StdRuntime`] bundles it with a
//! [`tap_core::Runtime`] so a host can poll for work and flush it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::task::Waker;

use futures_task::ArcWake;
use tap_core::{Result, Runtime, RuntimeConfig, RuntimeHandle, RuntimeScheduler};

type FlushWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that delegates work to Rust's threading primitives.
pub struct StdScheduler {
    flush_requested: AtomicBool,
    flush_waker: RwLock<Option<FlushWaker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            flush_requested: AtomicBool::new(false),
            flush_waker: RwLock::new(None),
        }
    }

    /// Returns whether a flush has been requested since the last call.
    pub fn take_flush_request(&self) -> bool {
        self.flush_requested.swap(false, Ordering::SeqCst)
    }

    pub fn has_flush_request(&self) -> bool {
        self.flush_requested.load(Ordering::SeqCst)
    }

    /// Registers a waker that will be invoked whenever a flush is requested.
    pub fn set_flush_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .flush_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered flush waker.
    pub fn clear_flush_waker(&self) {
        *self
            .flush_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .flush_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "flush_requested",
                &self.flush_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_flush(&self) {
        self.flush_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Waking the scheduler from an async task requests a flush.
impl ArcWake for StdScheduler {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.schedule_flush();
    }
}

/// Convenience container bundling the standard scheduler and a runtime.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    /// Creates a new standard runtime instance.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::with_config(scheduler.clone(), config);
        Self { scheduler, runtime }
    }

    /// Returns the [`tap_core::Runtime`] driven by the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Returns whether a flush was requested since the last poll.
    pub fn take_flush_request(&self) -> bool {
        self.scheduler.take_flush_request()
    }

    pub fn set_flush_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_flush_waker(waker);
    }

    pub fn clear_flush_waker(&self) {
        self.scheduler.clear_flush_waker();
    }

    /// A [`Waker`] that requests a flush when woken.
    pub fn waker(&self) -> Waker {
        futures_task::waker(self.scheduler())
    }

    /// Flush while flushes keep being requested. Returns the number of
    /// render+commit passes performed.
    pub fn run_until_idle(&self) -> Result<usize> {
        let mut passes = 0;
        while self.take_flush_request() || self.runtime.has_pending_updates() {
            passes += self.runtime.flush()?;
        }
        log::trace!("runtime idle after {passes} passes");
        Ok(passes)
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("runtime", &self.runtime)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tap_core::{resource, tap_state};
    use tap_testing::{init_logging, ResourceTester};

    use super::*;

    #[test]
    fn std_runtime_requests_flush_on_state_change() {
        init_logging();
        let runtime = StdRuntime::new();
        let tester = ResourceTester::mount_on(
            runtime.runtime(),
            resource(|_: ()| tap_state(|| 0)).element(()),
        )
        .expect("mount");
        assert!(!runtime.take_flush_request());

        tester.state().1.set(1);
        assert!(runtime.take_flush_request(), "state change should request a flush");
        tester.state().1.set(2);
        assert!(!runtime.take_flush_request(), "pending work is coalesced");

        assert_eq!(runtime.run_until_idle(), Ok(1));
        assert_eq!(tester.state().0, 2);
    }

    #[test]
    fn waker_invokes_registered_flush_waker() {
        let runtime = StdRuntime::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        runtime.set_flush_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        runtime.waker().wake_by_ref();
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
        assert!(runtime.take_flush_request());

        runtime.clear_flush_waker();
        runtime.waker().wake();
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.run_until_idle(), Ok(0));
    }
}
