use super::error::SetError;
use super::waiter::{self, Entry, Wait};
use crate::sealed::Registry;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

struct State<T> {
    value: RefCell<T>,
    notifying: Cell<bool>,
    waiters: Registry<Entry<(T, T)>>,
}

struct Notifying<'a>(&'a Cell<bool>);

impl Drop for Notifying<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Cell that lets tasks wait for its next change. Cloning yields another handle to the same cell.
pub struct Value<T>(Rc<State<T>>);

impl<T: Clone + PartialEq> Value<T> {
    pub fn new(initial: T) -> Self {
        Self(Rc::new(State {
            value: RefCell::new(initial),
            notifying: Cell::new(false),
            waiters: Registry::new(),
        }))
    }

    pub fn get(&self) -> T {
        self.0.value.borrow().clone()
    }

    /// Stores `new` and resumes every [`Value::changed`] waiter with `(old, new)`. Setting an
    /// equal value does nothing. Fails if called by a task that is being notified of a change.
    pub fn set(&self, new: T) -> Result<(), SetError<T>> {
        if *self.0.value.borrow() == new {
            return Ok(());
        }
        if self.0.notifying.get() {
            return Err(SetError::Reentrant(new));
        }
        let old = self.0.value.replace(new.clone());
        self.0.notifying.set(true);
        let _guard = Notifying(&self.0.notifying);
        let count = waiter::resume_all(&self.0.waiters, (old, new));
        log::trace!("value change delivered to {count} waiters");
        Ok(())
    }

    /// Completes with `(old, new)` on the next change.
    pub fn changed(&self) -> impl Future<Output = (T, T)> + '_ {
        Wait::on(&self.0.waiters)
    }
}

impl<T: Clone + PartialEq + Default> Default for Value<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Clone for Value<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("value", &self.0.value.borrow())
            .field("waiters", &self.0.waiters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task;
    use static_assertions::assert_not_impl_any;
    use tokio_test::task::spawn;
    use tokio_test::{assert_pending, assert_ready_eq};

    #[test]
    fn test_value_static_properties() {
        assert_not_impl_any!(Value<usize>: std::marker::Send, Sync);
    }

    #[test]
    fn test_set_and_get() {
        let value = Value::new(1);
        assert_eq!(1, value.get());
        value.set(2).unwrap();
        assert_eq!(2, value.get());
        assert_eq!(0, Value::<u8>::default().get());
    }

    #[test]
    fn test_changed_reports_old_and_new() {
        let value = Value::new("old".to_owned());
        let mut changed = spawn(value.changed());
        assert_pending!(changed.poll());

        value.set("new".to_owned()).unwrap();
        assert!(changed.is_woken());
        assert_ready_eq!(changed.poll(), ("old".to_owned(), "new".to_owned()));
    }

    #[test]
    fn test_setting_equal_value_notifies_nobody() {
        let value = Value::new(5);
        let mut changed = spawn(value.changed());
        assert_pending!(changed.poll());

        value.set(5).unwrap();
        assert!(!changed.is_woken());
        assert_pending!(changed.poll());
    }

    #[test]
    fn test_set_while_notifying_is_rejected() {
        let value = Value::new(0);
        let task = task::start({
            let value = value.clone();
            async move {
                let (_, new) = value.changed().await;
                value.set(new + 1)
            }
        });
        value.set(1).unwrap();
        assert_eq!(Some(Err(SetError::Reentrant(2))), task.take_output());
        assert_eq!(1, value.get());

        // the flag is cleared once the notification round is over
        value.set(3).unwrap();
        assert_eq!(3, value.get());
    }

    #[test]
    fn test_waiter_sees_every_change_in_a_loop() {
        let value = Value::new('a');
        let task = task::start({
            let value = value.clone();
            async move {
                let mut seen = String::new();
                for _ in 0..2 {
                    let (old, new) = value.changed().await;
                    seen.push(old);
                    seen.push(new);
                }
                seen
            }
        });
        value.set('b').unwrap();
        value.set('c').unwrap();
        assert_eq!(Some("abbc".to_owned()), task.take_output());
    }
}
