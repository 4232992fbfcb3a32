use super::waiter::{self, Entry, Wait};
use crate::sealed::Registry;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Wakes every current waiter with a copy of the fired value.
///
/// Firing is not latched: a task that starts waiting after [`Event::fire`] waits for the
/// next one. Cloning yields another handle to the same event.
pub struct Event<T>(Rc<Registry<Entry<T>>>);

impl<T: Clone> Event<T> {
    pub fn new() -> Self {
        Self(Rc::new(Registry::new()))
    }

    /// Resumes all tasks that were waiting when this was called, in the order they started
    /// waiting. Returns how many were resumed.
    pub fn fire(&self, value: T) -> usize {
        let count = waiter::resume_all(&self.0, value);
        log::trace!("event fired to {count} waiters");
        count
    }

    pub fn wait(&self) -> impl Future<Output = T> + '_ {
        Wait::on(&self.0)
    }
}

impl<T: Clone> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Event").field(&self.0.len()).finish()
    }
}
