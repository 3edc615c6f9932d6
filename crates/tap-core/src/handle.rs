//! Imperative handles over a resource instance.
//!
//! A handle hosts the element inside a small wrapper resource. The wrapper
//! keeps the latest props in a state cell, renders the element as its child
//! and notifies subscribers from an effect whenever the committed value
//! changes. Updates scheduled by the fiber are queued on the runtime and run
//! on the next flush.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::Result;
use crate::fiber::Fiber;
use crate::hooks::{tap_effect_with, tap_ref, tap_resource, tap_state, MutableRef, StateSetter};
use crate::resource::{resource, ResourceElement};
use crate::runtime::{Runtime, UpdateScheduler};

/// Props that compare by pointer, so every `update_input` counts as a change.
struct SharedProps<P>(Rc<P>);

impl<P> Clone for SharedProps<P> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<P> PartialEq for SharedProps<P> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

type Listener = Rc<dyn Fn()>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    listeners: IndexMap<u64, Listener>,
}

impl Subscribers {
    fn snapshot(&self) -> Vec<Listener> {
        self.listeners.values().cloned().collect()
    }
}

fn notify(subscribers: &MutableRef<Subscribers>) {
    let listeners = subscribers.with(Subscribers::snapshot);
    for listener in listeners {
        listener();
    }
}

/// What the wrapper resource exposes to its handle after each render.
struct HandleApi<P, R> {
    value: R,
    subscribers: MutableRef<Subscribers>,
    set_props: StateSetter<SharedProps<P>>,
}

impl<P, R: Clone> Clone for HandleApi<P, R> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            subscribers: self.subscribers.clone(),
            set_props: self.set_props.clone(),
        }
    }
}

fn handle_wrapper<P, R>(element: ResourceElement<P, R>) -> HandleApi<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    let (props, set_props) = tap_state(|| SharedProps(Rc::new(element.props.clone())));
    let value = tap_resource(element.resource.element(P::clone(&props.0)));

    let subscribers = tap_ref(Subscribers::default);
    let last_value = tap_ref(|| value.clone());
    {
        let subscribers = subscribers.clone();
        let value = value.clone();
        tap_effect_with(value.clone(), move || {
            if last_value.with(|last| *last != value) {
                last_value.set(value);
                notify(&subscribers);
            }
        });
    }

    HandleApi {
        value,
        subscribers,
        set_props,
    }
}

type WrapperFiber<P, R> = Fiber<ResourceElement<P, R>, HandleApi<P, R>>;

struct HandleInner<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    fiber: Rc<WrapperFiber<P, R>>,
    scheduler: UpdateScheduler,
    api: Rc<RefCell<HandleApi<P, R>>>,
}

impl<P, R> HandleInner<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    fn dispose(&self) -> Result<()> {
        if self.fiber.is_unmounted() {
            return Ok(());
        }
        log::debug!("dispose `{}` (fiber {})", self.fiber.name(), self.fiber.id());
        self.scheduler.cancel();
        self.fiber.unmount()
    }
}

impl<P, R> Drop for HandleInner<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    fn drop(&mut self) {
        if let Err(error) = self.dispose() {
            log::error!("failed to dispose dropped resource handle: {error}");
        }
    }
}

/// External handle to a live resource.
///
/// Clones share the instance. Dropping the last clone disposes it.
pub struct ResourceHandle<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    inner: Rc<HandleInner<P, R>>,
}

/// Registration returned by `subscribe`. Dropping it keeps the listener.
pub struct Subscription {
    cancel: Rc<dyn Fn()>,
}

impl Subscription {
    pub fn new(unsubscribe: impl Fn() + 'static) -> Self {
        Self {
            cancel: Rc::new(unsubscribe),
        }
    }

    /// Remove the listener. Calling it again has no effect.
    pub fn unsubscribe(&self) {
        (self.cancel)();
    }
}

impl Clone for Subscription {
    fn clone(&self) -> Self {
        Self {
            cancel: Rc::clone(&self.cancel),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

impl Runtime {
    /// Mount `element` on this runtime: render and commit it synchronously.
    pub fn create_resource<P, R>(&self, element: ResourceElement<P, R>) -> Result<ResourceHandle<P, R>>
    where
        P: Clone + 'static,
        R: Clone + PartialEq + 'static,
    {
        let _active = self.enter();
        let scheduler = UpdateScheduler::new(self.handle());
        let fiber = Rc::new(Fiber::new(resource(handle_wrapper::<P, R>), {
            let scheduler = scheduler.clone();
            move || scheduler.mark_dirty()
        }));

        let result = fiber.render(element.clone())?;
        let api = Rc::new(RefCell::new(result.state().clone()));
        scheduler.set_task({
            let fiber = Rc::downgrade(&fiber);
            let api = Rc::clone(&api);
            move || {
                let Some(fiber) = fiber.upgrade() else {
                    return Ok(());
                };
                if fiber.is_unmounted() {
                    return Ok(());
                }
                let result = fiber.render(element.clone())?;
                *api.borrow_mut() = result.state().clone();
                fiber.commit(result)
            }
        });

        let inner = Rc::new(HandleInner {
            fiber,
            scheduler,
            api,
        });
        inner.fiber.commit(result)?;
        log::debug!("mounted `{}` (fiber {})", inner.fiber.name(), inner.fiber.id());
        Ok(ResourceHandle { inner })
    }
}

/// Mount `element` on the current runtime.
pub fn create_resource<P, R>(element: ResourceElement<P, R>) -> Result<ResourceHandle<P, R>>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    Runtime::current().create_resource(element)
}

impl<P, R> ResourceHandle<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    /// The value of the latest render.
    pub fn get_state(&self) -> R {
        self.inner.api.borrow().value.clone()
    }

    /// Call `listener` after every commit that changes the value.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        let subscribers = self.inner.api.borrow().subscribers.clone();
        let id = subscribers.with_mut(|subscribers| {
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.listeners.insert(id, Rc::new(listener));
            id
        });
        Subscription::new(move || {
            subscribers.with_mut(|subscribers| {
                subscribers.listeners.shift_remove(&id);
            });
        })
    }

    /// Replace the element's props. The rerender happens on the next flush.
    pub fn update_input(&self, props: P) {
        if self.is_disposed() {
            log::debug!("ignoring input for disposed `{}`", self.inner.fiber.name());
            return;
        }
        let set_props = self.inner.api.borrow().set_props.clone();
        set_props.set(SharedProps(Rc::new(props)));
    }

    /// Unmount the resource, running every effect cleanup. Idempotent.
    pub fn dispose(&self) -> Result<()> {
        self.inner.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.fiber.is_unmounted()
    }

    /// Whether an update is queued and waiting for a flush.
    pub fn is_dirty(&self) -> bool {
        self.inner.scheduler.is_dirty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<P, R> Clone for ResourceHandle<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P, R> PartialEq for ResourceHandle<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<P, R> fmt::Debug for ResourceHandle<P, R>
where
    P: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("fiber", &self.inner.fiber)
            .field("dirty", &self.inner.scheduler.is_dirty())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/handle_tests.rs"]
mod tests;
