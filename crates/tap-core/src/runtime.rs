use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::error::{ResourceError, Result};
use crate::platform::RuntimeScheduler;

/// Tuning knobs for a [`Runtime`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of passes over the dirty queue a single flush makes
    /// before giving up with [`ResourceError::UpdateLoop`].
    pub max_flush_passes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_flush_passes: 100,
        }
    }
}

type UpdateTask = Rc<dyn Fn() -> Result<()>>;

struct SchedulerState {
    runtime: RuntimeHandle,
    dirty: Cell<bool>,
    cancelled: Cell<bool>,
    task: RefCell<Option<UpdateTask>>,
}

/// Coalesces update requests for one resource handle into a single queued pass.
#[derive(Clone)]
pub struct UpdateScheduler {
    state: Rc<SchedulerState>,
}

impl UpdateScheduler {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self {
            state: Rc::new(SchedulerState {
                runtime,
                dirty: Cell::new(false),
                cancelled: Cell::new(false),
                task: RefCell::new(None),
            }),
        }
    }

    /// Install the work a flush performs for this scheduler.
    pub fn set_task(&self, task: impl Fn() -> Result<()> + 'static) {
        *self.state.task.borrow_mut() = Some(Rc::new(task));
    }

    /// Queue this scheduler on its runtime. Idempotent until the next flush.
    pub fn mark_dirty(&self) {
        if self.state.cancelled.get() || self.state.dirty.get() {
            return;
        }
        match self.state.runtime.0.upgrade() {
            Some(inner) => {
                self.state.dirty.set(true);
                inner.enqueue(Rc::clone(&self.state));
            }
            None => log::debug!("dropping update: runtime is gone"),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty.get()
    }

    /// Stop accepting work and release the task.
    pub fn cancel(&self) {
        self.state.cancelled.set(true);
        self.state.dirty.set(false);
        self.state.task.borrow_mut().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }
}

impl fmt::Debug for UpdateScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("dirty", &self.state.dirty.get())
            .field("cancelled", &self.state.cancelled.get())
            .finish()
    }
}

struct RuntimeInner {
    config: RuntimeConfig,
    scheduler: Arc<dyn RuntimeScheduler>,
    queue: RefCell<VecDeque<Rc<SchedulerState>>>,
    flushing: Cell<bool>,
}

impl RuntimeInner {
    fn enqueue(&self, state: Rc<SchedulerState>) {
        self.queue.borrow_mut().push_back(state);
        self.scheduler.schedule_flush();
    }

    fn take_pass(&self) -> Vec<Rc<SchedulerState>> {
        self.queue.borrow_mut().drain(..).collect()
    }

    fn requeue_front(&self, pending: Vec<Rc<SchedulerState>>) {
        let mut queue = self.queue.borrow_mut();
        for state in pending.into_iter().rev() {
            queue.push_front(state);
        }
    }
}

/// Owns the queue of dirty resource handles and drains it on [`flush`](Self::flush).
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self::with_config(scheduler, RuntimeConfig::default())
    }

    pub fn with_config(scheduler: Arc<dyn RuntimeScheduler>, config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                scheduler,
                queue: RefCell::new(VecDeque::new()),
                flushing: Cell::new(false),
            }),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The runtime that is flushing or creating a resource on this thread, or
    /// the thread's default runtime.
    pub fn current() -> Runtime {
        if let Some(runtime) = ACTIVE_RUNTIMES.with(|stack| stack.borrow().last().cloned()) {
            return runtime;
        }
        DEFAULT_RUNTIME.with(Runtime::clone)
    }

    pub fn has_pending_updates(&self) -> bool {
        !self.inner.queue.borrow().is_empty()
    }

    pub fn pending_updates(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Run every queued update until the queue stays empty.
    ///
    /// Returns the number of render+commit passes performed. Calling this
    /// from inside a running flush returns `Ok(0)`; the outer flush picks up
    /// the new work.
    pub fn flush(&self) -> Result<usize> {
        if self.inner.flushing.get() {
            return Ok(0);
        }
        self.inner.flushing.set(true);
        let _active = self.enter();

        struct FlushGuard<'a>(&'a Cell<bool>);
        impl Drop for FlushGuard<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }
        let _flushing = FlushGuard(&self.inner.flushing);

        let mut updates = 0;
        let mut passes = 0;
        while self.has_pending_updates() {
            if passes == self.inner.config.max_flush_passes {
                log::warn!("updates still pending after {passes} flush passes");
                return Err(ResourceError::UpdateLoop { passes });
            }
            passes += 1;

            let mut pass = self.inner.take_pass().into_iter();
            while let Some(state) = pass.next() {
                state.dirty.set(false);
                if state.cancelled.get() {
                    continue;
                }
                let Some(task) = state.task.borrow().clone() else {
                    continue;
                };
                if let Err(error) = task() {
                    self.inner.requeue_front(pass.collect());
                    return Err(error);
                }
                updates += 1;
            }
        }
        Ok(updates)
    }

    /// Make this runtime current until the returned guard drops.
    pub(crate) fn enter(&self) -> ActiveRuntimeGuard {
        ACTIVE_RUNTIMES.with(|stack| stack.borrow_mut().push(self.clone()));
        ActiveRuntimeGuard { _private: () }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Arc::new(DefaultScheduler))
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("pending", &self.pending_updates())
            .field("flushing", &self.inner.flushing.get())
            .finish()
    }
}

pub(crate) struct ActiveRuntimeGuard {
    _private: (),
}

impl Drop for ActiveRuntimeGuard {
    fn drop(&mut self) {
        ACTIVE_RUNTIMES.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }

    pub fn flush(&self) -> Result<usize> {
        self.upgrade().map_or(Ok(0), |runtime| runtime.flush())
    }
}

/// Scheduler that never wakes anyone; the host calls `flush` itself.
#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_flush(&self) {}
}

thread_local! {
    static ACTIVE_RUNTIMES: RefCell<Vec<Runtime>> = const { RefCell::new(Vec::new()) };
    static DEFAULT_RUNTIME: Runtime = Runtime::default();
}

/// Flush the current runtime.
pub fn flush_pending() -> Result<usize> {
    Runtime::current().flush()
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
