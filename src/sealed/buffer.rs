use crate::sync::queue::{Discipline, Order};
use std::cell::RefCell;
use std::fmt;
use std::iter;

/// Item storage of a queue.
///
/// Unlike the other sealed containers this one runs element code (`Ord` of a small-first
/// discipline) while it is borrowed, so it is guarded by a `RefCell`: an `Ord` impl that
/// calls back into the owning queue panics instead of aliasing the buffer.
pub struct Buffer<T>(RefCell<Box<dyn Discipline<T>>>);

impl<T> Buffer<T> {
    pub fn new(discipline: Box<dyn Discipline<T>>) -> Self {
        Self(RefCell::new(discipline))
    }

    pub fn push(&self, item: T) {
        self.0.borrow_mut().push(item);
    }

    pub fn pop(&self) -> Option<T> {
        self.0.borrow_mut().pop()
    }

    /// Removes every item. The items are dropped after the buffer is released,
    /// so their destructors may safely touch the owning queue.
    pub fn clear(&self) {
        let items: Vec<T> = {
            let mut inner = self.0.borrow_mut();
            iter::from_fn(|| inner.pop()).collect()
        };
        drop(items);
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn kind(&self) -> Order {
        self.0.borrow().kind()
    }
}

impl<T> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(inner) => f
                .debug_struct("Buffer")
                .field("kind", &inner.kind())
                .field("len", &inner.len())
                .finish(),
            Err(_) => f.write_str("Buffer(<borrowed>)"),
        }
    }
}
