//! The commit phase: effect cells, queued commit tasks and cleanups.

use std::any::Any;
use std::fmt;

use crate::error::{raise, CellKind, ResourceError};
use crate::fiber::{FiberCore, HookCell};

/// Dependency list of an effect, compared with `PartialEq` between commits.
pub trait AnyDeps {
    fn as_any(&self) -> &dyn Any;

    /// Whether `self` differs from the deps stored by the previous run.
    fn changed(&self, previous: &dyn AnyDeps) -> bool;
}

impl<D: PartialEq + 'static> AnyDeps for D {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn changed(&self, previous: &dyn AnyDeps) -> bool {
        previous
            .as_any()
            .downcast_ref::<D>()
            .map_or(true, |previous| previous != self)
    }
}

/// What an effect leaves behind to undo itself.
#[derive(Default)]
pub struct Cleanup(Option<Box<dyn FnOnce()>>);

impl Cleanup {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(cleanup)))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn run(self) {
        if let Some(cleanup) = self.0 {
            cleanup();
        }
    }
}

impl From<()> for Cleanup {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

impl From<Option<Cleanup>> for Cleanup {
    fn from(cleanup: Option<Cleanup>) -> Self {
        cleanup.unwrap_or_default()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cleanup").field(&self.0.is_some()).finish()
    }
}

pub(crate) type EffectFn = Box<dyn FnOnce() -> Cleanup>;

/// One effect queued by a render, consumed by the following commit.
pub(crate) struct CommitTask {
    pub(crate) cell_index: usize,
    pub(crate) deps: Option<Box<dyn AnyDeps>>,
    pub(crate) effect: EffectFn,
}

#[derive(Default)]
pub(crate) struct EffectCell {
    mounted: bool,
    deps: Option<Box<dyn AnyDeps>>,
    cleanup: Option<Cleanup>,
}

impl EffectCell {
    fn should_run(&self, deps: Option<&dyn AnyDeps>) -> bool {
        if !self.mounted {
            return true;
        }
        match (deps, self.deps.as_deref()) {
            (Some(next), Some(previous)) => next.changed(previous),
            _ => true,
        }
    }
}

/// Reserve the effect cell for the hook at `index`.
pub(crate) fn reserve_effect_cell(fiber: &FiberCore, index: usize) {
    let found = match fiber.cells.borrow().get(index) {
        None => None,
        Some(HookCell::Effect(_)) => return,
        Some(other) => Some(other.kind()),
    };
    match found {
        None => fiber.push_cell(HookCell::Effect(EffectCell::default())),
        Some(found) => raise(ResourceError::HookOrderChanged {
            index,
            expected: CellKind::Effect,
            found,
        }),
    }
}

/// Decide whether the task's effect runs and, if so, take the old cleanup.
fn prepare(fiber: &FiberCore, task: &CommitTask) -> Option<Option<Cleanup>> {
    let kind = fiber.cells.borrow().get(task.cell_index).map(HookCell::kind);
    match kind {
        Some(CellKind::Effect) => {}
        Some(found) => raise(ResourceError::HookOrderChanged {
            index: task.cell_index,
            expected: CellKind::Effect,
            found,
        }),
        None => raise(ResourceError::TooManyHooks),
    }
    let mut cells = fiber.cells.borrow_mut();
    let Some(HookCell::Effect(cell)) = cells.get_mut(task.cell_index) else {
        return None;
    };
    if !cell.should_run(task.deps.as_deref()) {
        return None;
    }
    Some(cell.cleanup.take())
}

/// Run `tasks` in declaration order against the fiber's effect cells.
///
/// No cell borrow is held while user code runs, so effects may set state,
/// render other fibers or unmount this one.
pub(crate) fn commit_render(fiber: &FiberCore, tasks: Vec<CommitTask>) {
    for task in tasks {
        if fiber.is_unmounted() {
            break;
        }
        let Some(previous) = prepare(fiber, &task) else {
            continue;
        };
        if let Some(cleanup) = previous {
            cleanup.run();
        }

        let CommitTask {
            cell_index,
            deps,
            effect,
        } = task;
        let cleanup = effect();

        if fiber.is_unmounted() {
            // Unmounted by its own effect: the unmount pass already ran, so
            // nobody else will run this cleanup.
            cleanup.run();
            break;
        }
        if let Some(HookCell::Effect(cell)) = fiber.cells.borrow_mut().get_mut(cell_index) {
            cell.mounted = true;
            cell.deps = deps;
            cell.cleanup = Some(cleanup);
        }
    }
}

/// Run the stored cleanup of every mounted effect cell, in cell order.
pub(crate) fn cleanup_all_effects(fiber: &FiberCore) {
    let cleanups: Vec<Cleanup> = fiber
        .cells
        .borrow_mut()
        .iter_mut()
        .filter_map(|cell| match cell {
            HookCell::Effect(effect) if effect.mounted => {
                effect.mounted = false;
                effect.deps = None;
                effect.cleanup.take()
            }
            _ => None,
        })
        .collect();
    for cleanup in cleanups {
        cleanup.run();
    }
}
