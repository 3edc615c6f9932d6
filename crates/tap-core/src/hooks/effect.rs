use crate::commit::{reserve_effect_cell, AnyDeps, Cleanup, CommitTask};
use crate::context::current_fiber;

fn push_effect<C>(deps: Option<Box<dyn AnyDeps>>, effect: impl FnOnce() -> C + 'static)
where
    C: Into<Cleanup>,
{
    let fiber = current_fiber();
    let cell_index = fiber.next_index();
    reserve_effect_cell(&fiber, cell_index);
    fiber.commit_tasks.borrow_mut().push(CommitTask {
        cell_index,
        deps,
        effect: Box::new(move || effect().into()),
    });
}

/// Run `effect` after every commit of the current fiber.
///
/// The cleanup returned by the previous run is invoked first.
pub fn tap_effect<C>(effect: impl FnOnce() -> C + 'static)
where
    C: Into<Cleanup>,
{
    push_effect(None, effect);
}

/// Run `effect` on the first commit and on every commit where `deps` differs
/// from the value it had when the effect last ran. Pass `()` to run it once.
pub fn tap_effect_with<D, C>(deps: D, effect: impl FnOnce() -> C + 'static)
where
    D: PartialEq + 'static,
    C: Into<Cleanup>,
{
    push_effect(Some(Box::new(deps)), effect);
}
