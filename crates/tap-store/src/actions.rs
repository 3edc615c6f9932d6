use std::fmt;

use tap_core::{tap_effect, tap_ref, MutableRef};

/// Stable dispatcher over the latest committed actions value.
///
/// The handle keeps its identity across renders, so it can be captured by
/// memoized values or used as effect deps, while every read goes to the value
/// passed to [`tap_actions`] by the most recent commit.
pub struct Actions<T> {
    latest: MutableRef<T>,
}

impl<T> Actions<T> {
    /// Snapshot of the latest actions.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.latest.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.latest.with(f)
    }
}

impl<T> Clone for Actions<T> {
    fn clone(&self) -> Self {
        Self {
            latest: self.latest.clone(),
        }
    }
}

impl<T> PartialEq for Actions<T> {
    fn eq(&self, other: &Self) -> bool {
        self.latest == other.latest
    }
}

impl<T> fmt::Debug for Actions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions").finish_non_exhaustive()
    }
}

pub fn tap_actions<T: Clone + 'static>(actions: T) -> Actions<T> {
    let latest = tap_ref(|| actions.clone());
    {
        let latest = latest.clone();
        tap_effect(move || latest.set(actions));
    }
    Actions { latest }
}
