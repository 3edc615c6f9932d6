use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::current_slot;
use crate::error::{raise, ResourceError};
use crate::fiber::FiberCore;

pub(crate) struct StateSlot<T> {
    value: RefCell<T>,
    fiber: Weak<FiberCore>,
}

/// Writes to one state cell and schedules a rerender of its fiber.
pub struct StateSetter<T> {
    slot: Rc<StateSlot<T>>,
}

/// Persistent local state.
///
/// `init` runs once, when the cell is first created. The returned value is a
/// snapshot taken at render time.
pub fn tap_state<T>(init: impl FnOnce() -> T) -> (T, StateSetter<T>)
where
    T: Clone + PartialEq + 'static,
{
    let slot = current_slot(|fiber| StateSlot {
        value: RefCell::new(init()),
        fiber: Rc::downgrade(fiber),
    });
    let value = slot.value.borrow().clone();
    (value, StateSetter { slot })
}

impl<T: PartialEq + 'static> StateSetter<T> {
    /// Store `next` and schedule a rerender, unless it equals the current value.
    pub fn set(&self, next: T) {
        let Some(fiber) = self.slot.fiber.upgrade() else {
            log::debug!("ignoring state update: fiber was dropped");
            return;
        };
        if fiber.is_unmounted() {
            log::debug!("ignoring state update of unmounted `{}`", fiber.name());
            return;
        }
        if fiber.is_rendering.get() {
            raise(ResourceError::UpdatedDuringRender);
        }
        {
            let mut value = self.slot.value.borrow_mut();
            if *value == next {
                return;
            }
            *value = next;
        }
        fiber.schedule_rerender();
    }

    /// Compute the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = {
            let current = self.slot.value.borrow();
            f(&current)
        };
        self.set(next);
    }

    /// The latest stored value, which may be newer than the rendered snapshot.
    pub fn current(&self) -> T
    where
        T: Clone,
    {
        self.slot.value.borrow().clone()
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> PartialEq for StateSetter<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T> Eq for StateSetter<T> {}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("slot", &Rc::as_ptr(&self.slot))
            .finish()
    }
}
