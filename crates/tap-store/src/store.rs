use std::fmt;
use std::rc::Rc;

use tap_core::{
    raise, resource, tap_effect, tap_effect_with, tap_memo, tap_ref, tap_state, Cleanup, Resource,
    ResourceElement, ResourceHandle, Runtime, Subscription,
};

/// Anything a [`Store`] can read from and listen to.
pub trait StoreSource<S> {
    fn get_state(&self) -> S;

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription;
}

/// What a store body returns on every render.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreOutput<S, A> {
    pub state: S,
    pub actions: A,
}

impl<S, A> StoreOutput<S, A> {
    pub fn new(state: S, actions: A) -> Self {
        Self { state, actions }
    }
}

impl<P, S, A> StoreSource<S> for ResourceHandle<P, StoreOutput<S, A>>
where
    P: Clone + 'static,
    S: Clone + PartialEq + 'static,
    A: Clone + PartialEq + 'static,
{
    fn get_state(&self) -> S {
        ResourceHandle::get_state(self).state
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        ResourceHandle::subscribe(self, move || listener())
    }
}

/// Externally observable projection of a resource: state, change
/// notifications and a stable set of actions.
///
/// Clones share the source. Two stores are equal when they read from the
/// same source.
pub struct Store<S, A = ()> {
    source: Rc<dyn StoreSource<S>>,
    actions: A,
}

impl<S: 'static, A> Store<S, A> {
    pub fn new(source: impl StoreSource<S> + 'static, actions: A) -> Self {
        Self::from_source(Rc::new(source), actions)
    }
}

impl<S, A> Store<S, A> {
    pub fn from_source(source: Rc<dyn StoreSource<S>>, actions: A) -> Self {
        Self { source, actions }
    }

    pub fn get_state(&self) -> S {
        self.source.get_state()
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.source.subscribe(Rc::new(listener))
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn source(&self) -> &Rc<dyn StoreSource<S>> {
        &self.source
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.source), Rc::as_ptr(&other.source))
    }
}

impl<S, A: Clone> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            actions: self.actions.clone(),
        }
    }
}

impl<S, A> PartialEq for Store<S, A> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<S, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("source", &Rc::as_ptr(&self.source).cast::<()>())
            .finish_non_exhaustive()
    }
}

/// Host `element` as an independent resource and expose it as a [`Store`].
///
/// The nested resource is created on the first render and receives the
/// element's latest props after every later commit of the calling fiber. It is
/// disposed when the calling fiber unmounts. The returned store keeps its
/// identity for the life of the fiber.
pub fn tap_store<P, S, A>(element: ResourceElement<P, StoreOutput<S, A>>) -> Store<S, A>
where
    P: Clone + 'static,
    S: Clone + PartialEq + 'static,
    A: Clone + PartialEq + 'static,
{
    let (handle, _) = tap_state(|| {
        Runtime::current()
            .create_resource(element.clone())
            .unwrap_or_else(|error| raise(error))
    });

    let synced = tap_ref(|| false);
    {
        let handle = handle.clone();
        let props = element.into_props();
        tap_effect(move || {
            // The first commit follows creation, which already used these props.
            if synced.replace(true) {
                handle.update_input(props);
            }
        });
    }
    {
        let handle = handle.clone();
        tap_effect_with((), move || {
            Cleanup::new(move || {
                log::debug!("disposing store handle {handle:?}");
                handle.dispose().unwrap_or_else(|error| raise(error))
            })
        });
    }

    tap_memo((), || {
        let actions = handle.get_state().actions;
        Store::new(handle, actions)
    })
}

/// Turn a store body into a resource whose value is a [`Store`].
pub fn store<P, S, A, F>(body: F) -> Resource<P, Store<S, A>>
where
    F: Fn(P) -> StoreOutput<S, A> + 'static,
    P: Clone + 'static,
    S: Clone + PartialEq + 'static,
    A: Clone + PartialEq + 'static,
{
    let inner = resource(body);
    resource(move |props: P| tap_store(inner.element(props)))
}

/// Mirror an external store into the current fiber's state.
///
/// The fiber rerenders whenever the store reports a different state.
pub fn tap_store_state<S, A>(store: &Store<S, A>) -> S
where
    S: Clone + PartialEq + 'static,
    A: Clone + 'static,
{
    let (state, set_state) = tap_state(|| store.get_state());
    let source = store.clone();
    tap_effect_with(store.clone(), move || {
        set_state.set(source.get_state());
        let latest = source.clone();
        let subscription = source.subscribe(move || set_state.set(latest.get_state()));
        Cleanup::new(move || subscription.unsubscribe())
    });
    state
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
