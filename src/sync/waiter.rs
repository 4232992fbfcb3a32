//! Suspension protocol shared by every primitive in this crate.
//!
//! A suspended call owns an `Rc<Waiter>` and leaves a clone of it, together with an optional
//! payload, in a [`Registry`]. Whoever pops the entry resumes the waiter exactly once, which
//! stores the outcome and wakes the suspended task. Dropping the suspended call before that
//! tombstones the entry, so it can never be resumed.

use crate::sealed::{Registry, Ticket};
use std::cell::{Cell, UnsafeCell};
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

pub(crate) struct Waiter<O> {
    waker: UnsafeCell<Option<Waker>>,
    outcome: Cell<Option<O>>,
}

impl<O> Waiter<O> {
    fn new(cx: &Context<'_>) -> Rc<Self> {
        Rc::new(Self {
            waker: UnsafeCell::new(Some(cx.waker().clone())),
            outcome: Cell::new(None),
        })
    }

    /// Waiter that nobody polls. Its outcome is dropped together with it.
    pub(crate) fn detached() -> Rc<Self> {
        Rc::new(Self {
            waker: UnsafeCell::new(None),
            outcome: Cell::new(None),
        })
    }

    /// True for a waiter made by [`Waiter::detached`] that has not been resumed yet.
    pub(crate) fn is_detached(&self) -> bool {
        // SAFETY: no foreign code runs while the reference is alive
        unsafe { (*self.waker.get()).is_none() }
    }

    /// Stores the outcome and wakes the suspended task.
    /// The task may run to its next suspension point before this returns.
    pub(crate) fn resume(&self, outcome: O) {
        let previous = self.outcome.replace(Some(outcome));
        debug_assert!(previous.is_none(), "waiter resumed twice");
        // SAFETY: the waker is moved out before any foreign code runs
        let waker = unsafe { (*self.waker.get()).take() };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn poll_outcome(&self, cx: &Context<'_>) -> Poll<O> {
        match self.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                // SAFETY: no foreign code runs while the reference is alive
                let waker = unsafe { &mut *self.waker.get() };
                if waker.as_ref().is_none_or(|w| !w.will_wake(cx.waker())) {
                    waker.replace(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }

    fn take_outcome(&self) -> Option<O> {
        self.outcome.take()
    }
}

/// Registry entry of a suspended call.
pub(crate) struct Entry<O, P = ()> {
    pub(crate) waiter: Rc<Waiter<O>>,
    pub(crate) payload: P,
}

enum Stage<O, P> {
    Unregistered(P),
    Registered(Ticket, Rc<Waiter<O>>),
    Complete,
}

/// Future that registers itself in `registry` on first poll and completes once resumed.
pub(crate) struct Wait<'a, O, P = ()> {
    registry: &'a Registry<Entry<O, P>>,
    stage: Stage<O, P>,
}

impl<'a, O, P> Wait<'a, O, P> {
    pub(crate) fn new(registry: &'a Registry<Entry<O, P>>, payload: P) -> Self {
        Self {
            registry,
            stage: Stage::Unregistered(payload),
        }
    }
}

impl<O, P> Wait<'_, O, P> {
    /// Gives up waiting. Returns the outcome if it was delivered but not yet observed.
    pub(crate) fn abandon(&mut self) -> Option<O> {
        match mem::replace(&mut self.stage, Stage::Complete) {
            Stage::Registered(ticket, waiter) => {
                if self.registry.tombstone(ticket).is_some() {
                    log::trace!("pending waiter cancelled");
                    None
                } else {
                    waiter.take_outcome()
                }
            }
            _ => None,
        }
    }
}

impl<'a, O> Wait<'a, O> {
    pub(crate) fn on(registry: &'a Registry<Entry<O>>) -> Self {
        Self::new(registry, ())
    }
}

// Neither the payload nor the outcome is ever pinned.
impl<O, P> Unpin for Wait<'_, O, P> {}

impl<O, P> Future for Wait<'_, O, P> {
    type Output = O;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match mem::replace(&mut this.stage, Stage::Complete) {
            Stage::Unregistered(payload) => {
                let waiter = Waiter::new(cx);
                let ticket = this.registry.push(Entry {
                    waiter: waiter.clone(),
                    payload,
                });
                this.stage = Stage::Registered(ticket, waiter);
                Poll::Pending
            }
            Stage::Registered(ticket, waiter) => match waiter.poll_outcome(cx) {
                Poll::Ready(outcome) => Poll::Ready(outcome),
                Poll::Pending => {
                    this.stage = Stage::Registered(ticket, waiter);
                    Poll::Pending
                }
            },
            Stage::Complete => panic!("`Wait` polled after completion"),
        }
    }
}

impl<O, P> Drop for Wait<'_, O, P> {
    fn drop(&mut self) {
        if self.abandon().is_some() {
            log::debug!("waiter cancelled after being resumed, its outcome is dropped");
        }
    }
}

/// Resumes, in registration order, every live waiter that was registered before this call.
/// Waiters registered by the resumed tasks are left for the next round.
pub(crate) fn resume_all<O: Clone>(registry: &Registry<Entry<O>>, outcome: O) -> usize {
    let end = registry.end();
    let mut count = 0;
    while let Some(Entry { waiter, .. }) = registry.pop_live_before(end) {
        waiter.resume(outcome.clone());
        count += 1;
    }
    count
}
