//! Child resources hosted by the current fiber.
//!
//! Children are rendered during the host's render and committed from one
//! effect of the host, so every child commits before the host's later
//! effects and no child observes a sibling mid-update.

use std::rc::Rc;

use indexmap::IndexMap;

use super::{tap_effect, tap_effect_with, tap_ref, tap_rerender};
use crate::collections::map::HashSet;
use crate::commit::Cleanup;
use crate::error::{raise, ResourceError, Result};
use crate::fiber::{Fiber, RenderResult};
use crate::resource::{ResourceElement, ResourceKey};

type Entries<P, R> = IndexMap<ResourceKey, Rc<Fiber<P, R>>>;

/// Render one child fiber per keyed element and return their states in order.
///
/// Fibers are matched to elements by key: a key that was present in the
/// previous render keeps its fiber (and all of its state) as long as the
/// resource type is unchanged. Fibers whose key disappeared are unmounted
/// after the surviving children commit.
pub fn tap_resources<P, R>(elements: Vec<ResourceElement<P, R>>) -> Vec<R>
where
    P: Clone + 'static,
    R: Clone + 'static,
{
    let mut seen = HashSet::with_capacity(elements.len());
    let mut keyed = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        let Some(key) = element.key.clone() else {
            raise(ResourceError::MissingKey { index });
        };
        if !seen.insert(key.clone()) {
            raise(ResourceError::DuplicateKey {
                key: key.to_string(),
            });
        }
        keyed.push((key, element));
    }
    reconcile(keyed)
}

/// Host a single child resource.
///
/// A change of resource type (or of key, if one is set) remounts the child.
pub fn tap_resource<P, R>(element: ResourceElement<P, R>) -> R
where
    P: Clone + 'static,
    R: Clone + 'static,
{
    let key = element.key.clone().unwrap_or(ResourceKey::Int(0));
    match reconcile(vec![(key, element)]).pop() {
        Some(state) => state,
        None => unreachable!("one element always renders one child"),
    }
}

/// Run the element's body as part of the current fiber.
///
/// Its hooks are recorded on the calling fiber, so the element's resource
/// must not change between renders.
pub fn tap_inline_resource<P, R>(element: ResourceElement<P, R>) -> R {
    let ResourceElement {
        resource, props, ..
    } = element;
    resource.call(props)
}

fn reconcile<P, R>(elements: Vec<(ResourceKey, ResourceElement<P, R>)>) -> Vec<R>
where
    P: Clone + 'static,
    R: Clone + 'static,
{
    let entries = tap_ref(Entries::<P, R>::new);
    let rerender = tap_rerender();

    let mut keys = HashSet::with_capacity(elements.len());
    let mut rendered: Vec<(Rc<Fiber<P, R>>, RenderResult<P, R>)> =
        Vec::with_capacity(elements.len());
    let mut states = Vec::with_capacity(elements.len());

    for (key, element) in elements {
        let ResourceElement {
            resource, props, ..
        } = element;
        let existing = entries.with(|entries| entries.get(&key).cloned());
        let fiber = match existing {
            Some(fiber) if fiber.resource_type() == resource.resource_type() => {
                fiber.set_resource(resource);
                fiber
            }
            stale => {
                let rerender = rerender.clone();
                let fiber = Rc::new(Fiber::new(resource, move || rerender.request()));
                entries.with_mut(|entries| entries.insert(key.clone(), Rc::clone(&fiber)));
                if let Some(stale) = stale {
                    log::debug!("replacing `{}` at key {key}", stale.name());
                    stale.unmount().unwrap_or_else(|error| raise(error));
                }
                fiber
            }
        };
        let result = fiber.render(props).unwrap_or_else(|error| raise(error));
        states.push(result.state().clone());
        rendered.push((fiber, result));
        keys.insert(key);
    }

    let committed = entries.clone();
    tap_effect(move || {
        for (fiber, result) in rendered {
            fiber.commit(result).unwrap_or_else(|error| raise(error));
        }
        let removed: Vec<Rc<Fiber<P, R>>> = committed.with_mut(|entries| {
            let mut removed = Vec::new();
            entries.retain(|key, fiber| {
                let keep = keys.contains(key);
                if !keep {
                    removed.push(Rc::clone(fiber));
                }
                keep
            });
            removed
        });
        unmount_all(removed).unwrap_or_else(|error| raise(error));
    });

    tap_effect_with((), move || {
        Cleanup::new(move || {
            let remaining = entries.with_mut(|entries| {
                entries
                    .drain(..)
                    .map(|(_, fiber)| fiber)
                    .collect::<Vec<_>>()
            });
            unmount_all(remaining).unwrap_or_else(|error| raise(error));
        })
    });

    states
}

/// Unmount every fiber, reporting the first failure after all were visited.
fn unmount_all<P, R>(fibers: Vec<Rc<Fiber<P, R>>>) -> Result<()>
where
    P: Clone + 'static,
    R: 'static,
{
    let mut first_error = None;
    for fiber in fibers {
        if let Err(error) = fiber.unmount() {
            first_error.get_or_insert(error);
        }
    }
    first_error.map_or(Ok(()), Err)
}
