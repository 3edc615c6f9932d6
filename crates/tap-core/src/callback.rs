use std::fmt;
use std::rc::Rc;

/// A shared closure that compares by identity.
///
/// Resource outputs are compared with `PartialEq` to decide whether anything
/// changed; a `Callback` is equal only to its own clones, so a new closure
/// built during a render always counts as a change while a memoized one never
/// does.
pub struct Callback<A = (), R = ()> {
    f: Rc<dyn Fn(A) -> R>,
}

impl<A, R> Callback<A, R> {
    pub fn new(f: impl Fn(A) -> R + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    pub fn call(&self, arg: A) -> R {
        (self.f)(arg)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl<A, R> Clone for Callback<A, R> {
    fn clone(&self) -> Self {
        Self {
            f: Rc::clone(&self.f),
        }
    }
}

impl<A, R> PartialEq for Callback<A, R> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<A, R> Eq for Callback<A, R> {}

impl<A, R> fmt::Debug for Callback<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("ptr", &Rc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

impl<A, R, F> From<F> for Callback<A, R>
where
    F: Fn(A) -> R + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_are_equal_new_closures_are_not() {
        let a = Callback::new(|x: i32| x + 1);
        let b = a.clone();
        let c = Callback::new(|x: i32| x + 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(b.call(1), 2);
    }
}
