use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tap_core::{ResourceElement, ResourceHandle, Result, Runtime, Subscription};

/// Install `env_logger` for the test binary. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Shared, append-only record of calls made by resources under test.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Return the entries recorded so far and start over.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|recorded| recorded.as_str() == entry)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// A closure that records `entry` every time it is called.
    pub fn recorder(&self, entry: impl Into<String>) -> impl Fn() + 'static {
        let log = self.clone();
        let entry = entry.into();
        move || log.push(entry.clone())
    }
}

/// Mounts a resource on a private runtime and counts its notifications.
pub struct ResourceTester<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    runtime: Runtime,
    handle: ResourceHandle<P, R>,
    notifications: Rc<Cell<usize>>,
    subscription: Subscription,
}

impl<P, R> ResourceTester<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    pub fn mount(element: ResourceElement<P, R>) -> Result<Self> {
        Self::mount_on(Runtime::default(), element)
    }

    pub fn mount_on(runtime: Runtime, element: ResourceElement<P, R>) -> Result<Self> {
        let handle = runtime.create_resource(element)?;
        let notifications = Rc::new(Cell::new(0));
        let subscription = {
            let notifications = Rc::clone(&notifications);
            handle.subscribe(move || notifications.set(notifications.get() + 1))
        };
        Ok(Self {
            runtime,
            handle,
            notifications,
            subscription,
        })
    }

    pub fn state(&self) -> R {
        self.handle.get_state()
    }

    pub fn handle(&self) -> &ResourceHandle<P, R> {
        &self.handle
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Run queued updates until idle; returns the number of passes.
    pub fn settle(&self) -> Result<usize> {
        let passes = self.runtime.flush()?;
        log::trace!("settled after {passes} passes");
        Ok(passes)
    }

    /// Replace the props and settle.
    pub fn update(&self, props: P) -> Result<usize> {
        self.handle.update_input(props);
        self.settle()
    }

    /// Number of change notifications since mount.
    pub fn notifications(&self) -> usize {
        self.notifications.get()
    }

    pub fn dispose(&self) -> Result<()> {
        self.handle.dispose()
    }
}

impl<P, R> Drop for ResourceTester<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_core::{resource, tap_state};

    #[test]
    fn call_log_counts_and_drains() {
        let log = CallLog::new();
        let record = log.recorder("tick");
        record();
        record();
        log.push("tock");
        assert_eq!(log.count("tick"), 2);
        assert_eq!(log.take(), ["tick", "tick", "tock"]);
        assert!(log.is_empty());
    }

    #[test]
    fn tester_settles_and_counts_notifications() {
        init_logging();
        let tester = ResourceTester::mount(
            resource(|start: i32| {
                let (value, set) = tap_state(move || start);
                (value, set)
            })
            .element(1),
        )
        .expect("mount");
        assert_eq!(tester.state().0, 1);

        tester.state().1.set(2);
        assert_eq!(tester.settle(), Ok(1));
        assert_eq!(tester.state().0, 2);
        assert_eq!(tester.notifications(), 1);

        // New props do not reset existing state.
        assert_eq!(tester.update(10), Ok(1));
        assert_eq!(tester.state().0, 2);
        assert_eq!(tester.notifications(), 1);
    }
}
