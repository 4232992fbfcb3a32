use std::cell::UnsafeCell;

/// Interior-mutable cell whose contents are only reachable from inside a closure.
/// Nothing borrowed from it can outlive the closure, so as long as closures never
/// call back into code that touches the same cell, access is exclusive.
pub struct SealedCell<T>(UnsafeCell<T>);

impl<T> SealedCell<T> {
    pub fn new(inner: T) -> Self {
        Self(UnsafeCell::new(inner))
    }

    /// # Safety
    /// `f` must not (directly or through wakers, drops or user callbacks) re-enter
    /// another `with()` on the same cell.
    #[inline(always)]
    pub unsafe fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        f(unsafe { &mut *self.0.get() })
    }
}
