use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tap_core::Subscription;

use crate::store::{Store, StoreSource};

struct MappedSource<S, T> {
    source: Rc<dyn StoreSource<S>>,
    map: Rc<dyn Fn(&S) -> T>,
}

impl<S: 'static, T: PartialEq + 'static> StoreSource<T> for MappedSource<S, T> {
    fn get_state(&self) -> T {
        (self.map)(&self.source.get_state())
    }

    fn subscribe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        let last = RefCell::new(self.get_state());
        let source: Weak<dyn StoreSource<S>> = Rc::downgrade(&self.source);
        let map = Rc::clone(&self.map);
        self.source.subscribe(Rc::new(move || {
            let Some(source) = source.upgrade() else {
                return;
            };
            let next = map(&source.get_state());
            if *last.borrow() == next {
                log::trace!("mapped store value unchanged");
                return;
            }
            *last.borrow_mut() = next;
            listener();
        }))
    }
}

/// A read-only store over `map(store.get_state())`.
///
/// Listeners run only when the mapped value changes.
pub fn map_store<S, A, T>(store: &Store<S, A>, map: impl Fn(&S) -> T + 'static) -> Store<T>
where
    S: 'static,
    T: PartialEq + 'static,
{
    Store::new(
        MappedSource {
            source: Rc::clone(store.source()),
            map: Rc::new(map),
        },
        (),
    )
}
