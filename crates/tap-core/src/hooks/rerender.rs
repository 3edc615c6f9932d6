use std::fmt;
use std::rc::Weak;

use crate::context::current_fiber;
use crate::fiber::FiberCore;

/// Requests a rerender of the fiber that called [`tap_rerender`].
#[derive(Clone)]
pub struct Rerender {
    fiber: Weak<FiberCore>,
}

impl Rerender {
    pub fn request(&self) {
        if let Some(fiber) = self.fiber.upgrade() {
            fiber.schedule_rerender();
        }
    }
}

impl PartialEq for Rerender {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.fiber, &other.fiber)
    }
}

impl fmt::Debug for Rerender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rerender").finish_non_exhaustive()
    }
}

/// The current fiber's rerender trigger. Reserves no cell.
pub fn tap_rerender() -> Rerender {
    Rerender {
        fiber: std::rc::Rc::downgrade(&current_fiber()),
    }
}
