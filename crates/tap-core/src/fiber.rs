//! Fibers: the persistent record of one resource instance.
//!
//! A fiber owns its hook cells, the commit tasks queued by its latest render
//! and its lifecycle flags. Rendering and committing are separate steps so a
//! parent can render every child first and commit them together later.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::commit::{cleanup_all_effects, commit_render, CommitTask, EffectCell};
use crate::context::with_resource_fiber;
use crate::error::{catch, raise, CellKind, ResourceError, Result};
use crate::resource::Resource;

pub type FiberId = u64;

static NEXT_FIBER_ID: AtomicU64 = AtomicU64::new(1);

fn next_fiber_id() -> FiberId {
    NEXT_FIBER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Lifecycle of a fiber.
///
/// `Rendering` covers the span from the start of a render until its commit.
/// `Unmounted` is terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FiberPhase {
    Uninitialized,
    Rendering,
    Committed,
    Unmounted,
}

/// One persisted hook slot, addressed by call order.
pub(crate) enum HookCell {
    /// Holds an `Rc<StateCell<T>>`.
    State(Rc<dyn Any>),
    Effect(EffectCell),
}

impl HookCell {
    pub(crate) fn kind(&self) -> CellKind {
        match self {
            HookCell::State(_) => CellKind::State,
            HookCell::Effect(_) => CellKind::Effect,
        }
    }
}

/// The type-erased part of a fiber that hooks operate on.
pub(crate) struct FiberCore {
    id: FiberId,
    name: &'static str,
    pub(crate) cells: RefCell<Vec<HookCell>>,
    pub(crate) commit_tasks: RefCell<Vec<CommitTask>>,
    pub(crate) current_index: Cell<usize>,
    pub(crate) is_rendering: Cell<bool>,
    pub(crate) is_first_render: Cell<bool>,
    pub(crate) phase: Cell<FiberPhase>,
    schedule_rerender: Box<dyn Fn()>,
}

impl FiberCore {
    fn new(name: &'static str, schedule_rerender: Box<dyn Fn()>) -> Self {
        Self {
            id: next_fiber_id(),
            name,
            cells: RefCell::new(Vec::new()),
            commit_tasks: RefCell::new(Vec::new()),
            current_index: Cell::new(0),
            is_rendering: Cell::new(false),
            is_first_render: Cell::new(true),
            phase: Cell::new(FiberPhase::Uninitialized),
            schedule_rerender,
        }
    }

    pub(crate) fn id(&self) -> FiberId {
        self.id
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn is_unmounted(&self) -> bool {
        self.phase.get() == FiberPhase::Unmounted
    }

    pub(crate) fn schedule_rerender(&self) {
        if self.is_unmounted() {
            log::debug!("ignoring rerender of unmounted resource `{}` (fiber {})", self.name, self.id);
            return;
        }
        (self.schedule_rerender)();
    }

    /// Reserve the next cell index for the hook being called.
    pub(crate) fn next_index(&self) -> usize {
        let index = self.current_index.get();
        self.current_index.set(index + 1);
        if !self.is_first_render.get() && index >= self.cells.borrow().len() {
            raise(ResourceError::TooManyHooks);
        }
        index
    }

    /// The state cell at `index`, or `None` if it has not been created yet.
    pub(crate) fn state_at(&self, index: usize) -> Option<Rc<dyn Any>> {
        let found = match self.cells.borrow().get(index) {
            None => return None,
            Some(HookCell::State(cell)) => return Some(Rc::clone(cell)),
            Some(other) => other.kind(),
        };
        raise(ResourceError::HookOrderChanged {
            index,
            expected: CellKind::State,
            found,
        })
    }

    pub(crate) fn push_cell(&self, cell: HookCell) {
        self.cells.borrow_mut().push(cell);
    }

    pub(crate) fn take_commit_tasks(&self) -> Vec<CommitTask> {
        std::mem::take(&mut *self.commit_tasks.borrow_mut())
    }
}

/// Output of [`Fiber::render`], consumed by [`Fiber::commit`].
pub struct RenderResult<P, R> {
    pub(crate) commit_tasks: Vec<CommitTask>,
    props: P,
    state: R,
}

impl<P, R> RenderResult<P, R> {
    pub fn state(&self) -> &R {
        &self.state
    }

    pub fn props(&self) -> &P {
        &self.props
    }

    /// Number of effects this render queued for its commit.
    pub fn pending_effects(&self) -> usize {
        self.commit_tasks.len()
    }
}

/// A live instance of a [`Resource`].
pub struct Fiber<P, R> {
    core: Rc<FiberCore>,
    resource: RefCell<Resource<P, R>>,
    committed_props: RefCell<Option<P>>,
}

impl<P, R> Fiber<P, R>
where
    P: Clone + 'static,
    R: 'static,
{
    /// Create a fiber; `schedule_rerender` is invoked whenever one of its
    /// state cells changes.
    pub fn new(resource: Resource<P, R>, schedule_rerender: impl Fn() + 'static) -> Self {
        let core = Rc::new(FiberCore::new(resource.name(), Box::new(schedule_rerender)));
        log::debug!("created fiber {} for `{}`", core.id(), core.name());
        Self {
            core,
            resource: RefCell::new(resource),
            committed_props: RefCell::new(None),
        }
    }

    pub fn id(&self) -> FiberId {
        self.core.id()
    }

    pub fn name(&self) -> &'static str {
        self.core.name()
    }

    pub fn phase(&self) -> FiberPhase {
        self.core.phase.get()
    }

    pub fn is_unmounted(&self) -> bool {
        self.core.is_unmounted()
    }

    pub fn resource_type(&self) -> TypeId {
        self.resource.borrow().resource_type()
    }

    /// Number of hook cells recorded so far.
    pub fn cell_count(&self) -> usize {
        self.core.cells.borrow().len()
    }

    /// Props of the latest commit (or of the first render, before any commit).
    pub fn committed_props(&self) -> Option<P> {
        self.committed_props.borrow().clone()
    }

    /// Swap in a render function of the same resource type.
    pub(crate) fn set_resource(&self, resource: Resource<P, R>) {
        debug_assert_eq!(resource.resource_type(), self.resource_type());
        *self.resource.borrow_mut() = resource;
    }

    /// Run the resource body with `props`. No effect runs here.
    pub fn render(&self, props: P) -> Result<RenderResult<P, R>> {
        if self.core.is_unmounted() {
            return Err(ResourceError::Unmounted {
                resource: self.core.name(),
            });
        }
        let resource = self.resource.borrow().clone();
        log::trace!("render `{}` (fiber {})", self.core.name(), self.core.id());

        let input = props.clone();
        let state = with_resource_fiber(&self.core, move || resource.call(input))?;

        let mut committed = self.committed_props.borrow_mut();
        if committed.is_none() {
            *committed = Some(props.clone());
        }
        drop(committed);

        Ok(RenderResult {
            commit_tasks: self.core.take_commit_tasks(),
            props,
            state,
        })
    }

    /// Run the effects queued by `result`, in declaration order.
    pub fn commit(&self, result: RenderResult<P, R>) -> Result<()> {
        if self.core.is_unmounted() {
            log::debug!("dropping commit for unmounted `{}`", self.core.name());
            return Ok(());
        }
        log::trace!("commit `{}` (fiber {})", self.core.name(), self.core.id());
        let RenderResult {
            commit_tasks,
            props,
            ..
        } = result;
        catch(|| commit_render(&self.core, commit_tasks))?;
        *self.committed_props.borrow_mut() = Some(props);
        if !self.core.is_unmounted() {
            self.core.phase.set(FiberPhase::Committed);
        }
        Ok(())
    }

    /// Run every mounted effect cleanup once. Further renders fail.
    pub fn unmount(&self) -> Result<()> {
        if self.core.is_unmounted() {
            return Ok(());
        }
        log::debug!("unmount `{}` (fiber {})", self.core.name(), self.core.id());
        self.core.phase.set(FiberPhase::Unmounted);
        self.core.commit_tasks.borrow_mut().clear();
        catch(|| cleanup_all_effects(&self.core))
    }
}

impl<P, R> fmt::Debug for Fiber<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .field("phase", &self.core.phase.get())
            .field("cells", &self.core.cells.borrow().len())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/fiber_tests.rs"]
mod tests;
