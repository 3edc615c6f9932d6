//! Hook primitives.
//!
//! Every hook reads or creates the cell at the current call-order index of
//! the fiber that is rendering. Calling one outside of a render raises
//! [`ResourceError::NoActiveFiber`](crate::ResourceError::NoActiveFiber).

mod effect;
mod memo;
mod refs;
mod rerender;
mod resources;
mod state;

use std::any::Any;
use std::rc::Rc;

use crate::context::current_fiber;
use crate::error::{raise, ResourceError};
use crate::fiber::{FiberCore, HookCell};

pub use effect::{tap_effect, tap_effect_with};
pub use memo::{tap_callback, tap_memo};
pub use refs::{tap_ref, MutableRef};
pub use rerender::{tap_rerender, Rerender};
pub use resources::{tap_inline_resource, tap_resource, tap_resources};
pub use state::{tap_state, StateSetter};

/// Fetch the state slot at the next index, creating it with `init` on first use.
fn reserve_slot<S: Any>(fiber: &Rc<FiberCore>, init: impl FnOnce() -> S) -> Rc<S> {
    let index = fiber.next_index();
    match fiber.state_at(index) {
        Some(slot) => slot
            .downcast::<S>()
            .unwrap_or_else(|_| raise(ResourceError::StateTypeChanged { index })),
        None => {
            let slot = Rc::new(init());
            fiber.push_cell(HookCell::State(slot.clone() as Rc<dyn Any>));
            slot
        }
    }
}

fn current_slot<S: Any>(init: impl FnOnce(&Rc<FiberCore>) -> S) -> Rc<S> {
    let fiber = current_fiber();
    reserve_slot(&fiber, || init(&fiber))
}

#[cfg(test)]
#[path = "../tests/hooks_tests.rs"]
mod tests;
