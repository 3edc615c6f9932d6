//! The execution context: which fiber is rendering on this thread.
//!
//! Fibers nest (a parent renders its children from inside its own render), so
//! the slot is a stack; hooks always address the innermost entry. The only
//! reentrancy that is rejected is a fiber re-entering its own render.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{catch, raise, ResourceError, Result};
use crate::fiber::{FiberCore, FiberPhase};

thread_local! {
    static CURRENT_FIBER: RefCell<Vec<Rc<FiberCore>>> = const { RefCell::new(Vec::new()) };
}

/// Render `f` as the body of `fiber`.
///
/// Resets the fiber's per-render bookkeeping, installs it as the current
/// fiber, runs `f`, verifies the hook count and restores the previous fiber.
/// Errors raised by hooks inside `f` are returned as `Err`.
pub(crate) fn with_resource_fiber<T>(fiber: &Rc<FiberCore>, f: impl FnOnce() -> T) -> Result<T> {
    if fiber.is_rendering.get() {
        return Err(ResourceError::ExecutionContextLocked {
            resource: fiber.name(),
        });
    }
    fiber.is_rendering.set(true);
    fiber.phase.set(FiberPhase::Rendering);
    fiber.commit_tasks.borrow_mut().clear();
    fiber.current_index.set(0);

    CURRENT_FIBER.with(|stack| stack.borrow_mut().push(Rc::clone(fiber)));

    struct Guard<'a>(&'a FiberCore);
    impl Drop for Guard<'_> {
        fn drop(&mut self) {
            CURRENT_FIBER.with(|stack| {
                stack.borrow_mut().pop();
            });
            self.0.is_rendering.set(false);
        }
    }
    let _guard = Guard(fiber);

    let value = catch(f)?;
    fiber.is_first_render.set(false);

    let rendered = fiber.current_index.get();
    let expected = fiber.cells.borrow().len();
    if rendered != expected {
        return Err(ResourceError::HookCountMismatch { rendered, expected });
    }
    Ok(value)
}

/// The fiber whose render is in progress. Raises `NoActiveFiber` otherwise.
pub(crate) fn current_fiber() -> Rc<FiberCore> {
    CURRENT_FIBER
        .with(|stack| stack.borrow().last().cloned())
        .unwrap_or_else(|| raise(ResourceError::NoActiveFiber))
}

/// Whether any resource is rendering on this thread.
pub fn is_rendering() -> bool {
    CURRENT_FIBER.with(|stack| !stack.borrow().is_empty())
}

/// Number of fibers currently on the render stack.
pub fn render_depth() -> usize {
    CURRENT_FIBER.with(|stack| stack.borrow().len())
}
