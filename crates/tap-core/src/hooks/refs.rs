use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::current_slot;

/// A mutable box that survives renders. Writing to it never rerenders.
pub struct MutableRef<T> {
    cell: Rc<RefCell<T>>,
}

pub fn tap_ref<T: 'static>(init: impl FnOnce() -> T) -> MutableRef<T> {
    MutableRef {
        cell: current_slot(|_| RefCell::new(init())),
    }
}

impl<T> MutableRef<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }

    pub fn replace(&self, value: T) -> T {
        self.cell.replace(value)
    }

    pub fn take(&self) -> T
    where
        T: Default,
    {
        self.cell.take()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.cell.borrow_mut())
    }
}

impl<T> Clone for MutableRef<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> PartialEq for MutableRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T> Eq for MutableRef<T> {}

impl<T: fmt::Debug> fmt::Debug for MutableRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(value) => f.debug_tuple("MutableRef").field(&*value).finish(),
            Err(_) => f.write_str("MutableRef(<borrowed>)"),
        }
    }
}
