//! Minimal executor whose wakers poll the woken task on the spot.
//!
//! Waking a task runs it until its next suspension point before `wake()` returns, so a
//! primitive resuming several waiters in a row observes each resumed task's follow-up calls
//! before resuming the next one. Tasks live in a thread-local table; wakers only carry the
//! task id, so a waker that ends up on another thread does nothing.

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::mem;
use std::ptr;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

struct Entry {
    /// `None` while the task is being polled.
    future: Option<LocalBoxFuture<'static, ()>>,
    woken_while_running: bool,
    cancelled: bool,
}

thread_local! {
    static TASKS: RefCell<HashMap<usize, Entry>> = RefCell::new(HashMap::new());
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Status {
    Running,
    Finished,
    Cancelled,
}

struct Shared<T> {
    output: Cell<Option<T>>,
    status: Cell<Status>,
}

/// Handle to a task started with [`start`]. Dropping the handle does not cancel the task.
pub struct Task<T> {
    id: usize,
    shared: Rc<Shared<T>>,
}

/// Starts `future` as a new task and polls it right away.
pub fn start<F>(future: F) -> Task<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let shared = Rc::new(Shared {
        output: Cell::new(None),
        status: Cell::new(Status::Running),
    });
    let wrapped = {
        let shared = shared.clone();
        async move {
            let output = future.await;
            shared.output.set(Some(output));
            shared.status.set(Status::Finished);
        }
    };
    TASKS.with_borrow_mut(|tasks| {
        tasks.insert(
            id,
            Entry {
                future: Some(wrapped.boxed_local()),
                woken_while_running: false,
                cancelled: false,
            },
        );
    });
    log::trace!("task {id} started");
    step(id);
    Task { id, shared }
}

impl<T> Task<T> {
    pub fn is_finished(&self) -> bool {
        self.shared.status.get() == Status::Finished
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.status.get() == Status::Cancelled
    }

    /// Returns the output once, after the task has finished.
    pub fn take_output(&self) -> Option<T> {
        self.shared.output.take()
    }

    /// Drops the task's future, which cancels whatever it is waiting for. If the task is
    /// cancelling itself, its future is dropped as soon as the current poll returns.
    pub fn cancel(&self) {
        if self.shared.status.get() != Status::Running {
            return;
        }
        self.shared.status.set(Status::Cancelled);
        let future = TASKS.with_borrow_mut(|tasks| {
            let entry = tasks.get_mut(&self.id)?;
            if entry.future.is_none() {
                entry.cancelled = true;
                return None;
            }
            tasks.remove(&self.id).and_then(|entry| entry.future)
        });
        log::trace!("task {} cancelled", self.id);
        // dropped outside of the table borrow, it may wake other tasks
        drop(future);
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("status", &self.shared.status.get())
            .finish()
    }
}

enum Next {
    Repoll,
    Park,
    Retire,
}

fn step(id: usize) {
    let future = TASKS.with_borrow_mut(|tasks| {
        let entry = tasks.get_mut(&id)?;
        if entry.future.is_none() {
            entry.woken_while_running = true;
        }
        entry.future.take()
    });
    let Some(mut future) = future else {
        return;
    };

    let waker = task_waker(id);
    let mut cx = Context::from_waker(&waker);
    loop {
        let poll = future.as_mut().poll(&mut cx);
        let next = TASKS.with_borrow_mut(|tasks| {
            let Some(entry) = tasks.get_mut(&id) else {
                return Next::Retire;
            };
            if poll.is_ready() || entry.cancelled {
                tasks.remove(&id);
                Next::Retire
            } else if mem::take(&mut entry.woken_while_running) {
                Next::Repoll
            } else {
                Next::Park
            }
        });
        match next {
            Next::Repoll => continue,
            Next::Park => {
                TASKS.with_borrow_mut(|tasks| {
                    if let Some(entry) = tasks.get_mut(&id) {
                        entry.future = Some(future);
                    }
                });
                return;
            }
            Next::Retire => {
                if poll.is_ready() {
                    log::trace!("task {id} finished");
                }
                return;
            }
        }
    }
}

fn task_waker(id: usize) -> Waker {
    // SAFETY: the data is a plain integer, no resources to manage
    unsafe { Waker::from_raw(raw_waker(id)) }
}

fn raw_waker(id: usize) -> RawWaker {
    RawWaker::new(ptr::without_provenance(id), &VTABLE)
}

const VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake, drop_waker);

unsafe fn clone(data: *const ()) -> RawWaker {
    raw_waker(data.addr())
}

unsafe fn wake(data: *const ()) {
    // a waker used during thread teardown finds no table, there is nothing to run then
    if TASKS.try_with(|_| ()).is_ok() {
        step(data.addr());
    }
}

unsafe fn drop_waker(_: *const ()) {}
