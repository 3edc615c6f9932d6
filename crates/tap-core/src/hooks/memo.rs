use super::tap_ref;
use crate::callback::Callback;

/// Cache `compute()` until `deps` changes.
pub fn tap_memo<D, T>(deps: D, compute: impl FnOnce() -> T) -> T
where
    D: PartialEq + 'static,
    T: Clone + 'static,
{
    let cache = tap_ref(|| None::<(D, T)>);
    let hit = cache.with(|cached| match cached {
        Some((previous, value)) if *previous == deps => Some(value.clone()),
        _ => None,
    });
    if let Some(value) = hit {
        return value;
    }
    let value = compute();
    cache.set(Some((deps, value.clone())));
    value
}

/// A [`Callback`] that keeps its identity until `deps` changes.
pub fn tap_callback<D, A, O>(deps: D, f: impl Fn(A) -> O + 'static) -> Callback<A, O>
where
    D: PartialEq + 'static,
    A: 'static,
    O: 'static,
{
    tap_memo(deps, move || Callback::new(f))
}
