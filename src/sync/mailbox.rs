use super::waiter::{self, Entry, Wait};
use crate::sealed::Registry;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct State<T> {
    item: RefCell<Option<T>>,
    waiters: Registry<Entry<T>>,
}

/// Single-slot container. Getting does not take the item out; every getter receives a copy.
/// Cloning yields another handle to the same mailbox.
pub struct Mailbox<T>(Rc<State<T>>);

impl<T: Clone> Mailbox<T> {
    pub fn new() -> Self {
        Self(Rc::new(State {
            item: RefCell::new(None),
            waiters: Registry::new(),
        }))
    }

    pub fn is_empty(&self) -> bool {
        self.0.item.borrow().is_none()
    }

    /// Stores `item` if the mailbox is empty.
    pub fn put(&self, item: T) {
        if self.is_empty() {
            self.put_or_update(item);
        }
    }

    /// Replaces the stored item if there is one.
    pub fn update(&self, item: T) {
        if !self.is_empty() {
            self.put_or_update(item);
        }
    }

    /// Stores `item` and hands a copy to every waiting getter.
    pub fn put_or_update(&self, item: T) {
        self.0.item.replace(Some(item.clone()));
        let count = waiter::resume_all(&self.0.waiters, item);
        log::trace!("mailbox item delivered to {count} waiters");
    }

    /// Removes the stored item, if any.
    pub fn clear(&self) {
        // dropped after the borrow ends
        let _previous = self.0.item.take();
    }

    /// Returns a copy of the stored item, waiting for one if the mailbox is empty.
    pub async fn get(&self) -> T {
        let stored = self.0.item.borrow().clone();
        match stored {
            Some(item) => item,
            None => Wait::on(&self.0.waiters).await,
        }
    }
}

impl<T: Clone> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("is_empty", &self.0.item.borrow().is_none())
            .field("waiters", &self.0.waiters)
            .finish()
    }
}
