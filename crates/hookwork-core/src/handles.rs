//! Reference-typed values handed out by ref and callback slots.

use crate::deps::{Dep, Dependency, Identity};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Mutable box returned by `use_ref`. The same box comes back on every render
/// and writing to it never schedules a render.
pub struct RefBox<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for RefBox<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> RefBox<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    /// Run `f` with an immutable reference to the stored value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let borrow = self.inner.borrow();
        f(&*borrow)
    }

    /// Run `f` with a mutable reference to the stored value.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut borrow = self.inner.borrow_mut();
        f(&mut *borrow)
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    pub fn replace(&self, value: T) -> T {
        self.inner.replace(value)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> RefBox<T> {
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T: 'static> Dependency for RefBox<T> {
    fn to_dep(&self) -> Dep {
        Dep::Ref(Identity::of(&self.inner))
    }
}

impl<T: fmt::Debug> fmt::Debug for RefBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(value) => f.debug_tuple("RefBox").field(&*value).finish(),
            Err(_) => f.write_str("RefBox(<borrowed>)"),
        }
    }
}

/// Function handle cached by `use_callback`; compared by identity.
pub struct Callback<A, R = ()> {
    inner: Rc<dyn Fn(A) -> R>,
}

impl<A, R> Clone for Callback<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, R> Callback<A, R> {
    pub fn new(f: impl Fn(A) -> R + 'static) -> Self {
        Self { inner: Rc::new(f) }
    }

    pub fn call(&self, arg: A) -> R {
        (self.inner)(arg)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A: 'static, R: 'static> Dependency for Callback<A, R> {
    fn to_dep(&self) -> Dep {
        Dep::Ref(Identity::of(&self.inner))
    }
}

impl<A, R> fmt::Debug for Callback<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.inner) as *const ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shallow_equal;

    #[test]
    fn ref_box_writes_are_shared_between_clones() {
        let first = RefBox::new(0);
        let second = first.clone();
        second.update(|value| *value += 5);
        assert_eq!(first.get(), 5);
        assert_eq!(first.replace(9), 5);
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn callbacks_compare_by_identity() {
        let double = Callback::new(|x: i32| x * 2);
        let same = double.clone();
        let other = Callback::new(|x: i32| x * 2);
        assert_eq!(same.call(4), 8);
        assert!(shallow_equal(
            crate::deps![double].as_ref(),
            crate::deps![same].as_ref()
        ));
        assert!(!shallow_equal(
            crate::deps![double].as_ref(),
            crate::deps![other].as_ref()
        ));
    }
}
