#![doc = r"Resource engine: hooks-style state, effects and keyed sub-resources for any stateful unit, not just UI."]

pub mod callback;
pub mod collections;
pub mod commit;
mod context;
pub mod error;
pub mod fiber;
pub mod handle;
pub mod hooks;
pub mod platform;
pub mod resource;
pub mod runtime;

pub use callback::Callback;
pub use commit::{AnyDeps, Cleanup};
pub use context::{is_rendering, render_depth};
pub use error::{catch, raise, CellKind, ResourceError, Result};
pub use fiber::{Fiber, FiberId, FiberPhase, RenderResult};
pub use handle::{create_resource, ResourceHandle, Subscription};
pub use hooks::{
    tap_callback, tap_effect, tap_effect_with, tap_inline_resource, tap_memo, tap_ref,
    tap_rerender, tap_resource, tap_resources, tap_state, MutableRef, Rerender, StateSetter,
};
pub use platform::RuntimeScheduler;
pub use resource::{resource, Resource, ResourceElement, ResourceKey};
pub use runtime::{
    flush_pending, DefaultScheduler, Runtime, RuntimeConfig, RuntimeHandle, UpdateScheduler,
};
