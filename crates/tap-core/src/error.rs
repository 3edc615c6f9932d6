//! Contract violations reported by the engine.
//!
//! Every variant is a programmer error. Inside a render, hooks abort by
//! unwinding with the error as payload (see [`raise`]); the host-facing entry
//! points turn that unwinding back into a `Result` (see [`catch`]). Panics that
//! do not carry a [`ResourceError`] are never intercepted.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Kind of a persisted hook cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CellKind {
    State,
    Effect,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKind::State => f.write_str("state"),
            CellKind::Effect => f.write_str("effect"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("Execution context is locked: resource `{resource}` is already rendering")]
    ExecutionContextLocked { resource: &'static str },

    #[error("No resource fiber available: hooks may only be called while a resource renders")]
    NoActiveFiber,

    #[error(
        "Rendered more hooks than during the previous render. \
         Hooks must be called in the exact same order in every render."
    )]
    TooManyHooks,

    #[error(
        "Rendered {rendered} hooks but expected {expected}. \
         Hooks must be called in the exact same order in every render."
    )]
    HookCountMismatch { rendered: usize, expected: usize },

    #[error("Hook order changed between renders: expected a {expected} cell at index {index}, found a {found} cell")]
    HookOrderChanged {
        index: usize,
        expected: CellKind,
        found: CellKind,
    },

    #[error("Hook order changed between renders: state cell {index} holds a different type")]
    StateTypeChanged { index: usize },

    #[error("Resource updated during render")]
    UpdatedDuringRender,

    #[error(
        "tapResources: All resource elements must have a key. \
         Element at index {index} is missing a key."
    )]
    MissingKey { index: usize },

    #[error("tapResources: Duplicate key \"{key}\" found. All keys must be unique.")]
    DuplicateKey { key: String },

    #[error("resource `{resource}` cannot render after it was unmounted")]
    Unmounted { resource: &'static str },

    #[error("updates did not settle after {passes} flush passes")]
    UpdateLoop { passes: usize },
}

pub type Result<T, E = ResourceError> = std::result::Result<T, E>;

/// Abort the current render with `error`.
///
/// The error unwinds to the closest host boundary, which reports it as
/// `Err(error)`. Called outside of any boundary it behaves like a panic.
#[track_caller]
pub fn raise(error: ResourceError) -> ! {
    log::debug!("aborting: {error}");
    panic::panic_any(error)
}

/// Run `f`, converting a [`raise`]d error back into `Err`.
pub fn catch<T>(f: impl FnOnce() -> T) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<ResourceError>() {
            Ok(error) => Err(*error),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catch_returns_raised_error() {
        let result: Result<()> = catch(|| raise(ResourceError::UpdatedDuringRender));
        assert_eq!(result, Err(ResourceError::UpdatedDuringRender));
    }

    #[test]
    fn catch_passes_values_through() {
        assert_eq!(catch(|| 7), Ok(7));
    }

    #[test]
    #[should_panic(expected = "unrelated")]
    fn catch_does_not_swallow_foreign_panics() {
        let _ = catch(|| panic!("unrelated"));
    }

    #[test]
    fn messages_keep_the_contract_wording() {
        let err = ResourceError::DuplicateKey { key: "3".to_owned() };
        assert_eq!(
            err.to_string(),
            "tapResources: Duplicate key \"3\" found. All keys must be unique."
        );
        assert!(ResourceError::ExecutionContextLocked { resource: "counter" }
            .to_string()
            .starts_with("Execution context is locked"));
    }
}
