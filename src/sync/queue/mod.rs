//! Closable, optionally bounded producer/consumer queue for cooperative tasks.
//!
//! Any change of buffer occupancy runs a *transfer pass* that moves items from suspended
//! producers into the buffer and from the buffer to suspended consumers. Resumed tasks may
//! call back into the queue before the pass is over; such calls never start a nested pass,
//! they register as waiters and are served by the running one.
//!
//! ```
//! use futures::StreamExt;
//! use local_synctools::sync::queue::Queue;
//! use local_synctools::task;
//!
//! let q = Queue::fifo(Some(1)).unwrap();
//! let producer = task::start({
//!     let q = q.clone();
//!     async move {
//!         for c in "ABC".chars() {
//!             q.put(c).await.unwrap();
//!         }
//!         q.half_close();
//!     }
//! });
//! let consumer = task::start({
//!     let q = q.clone();
//!     async move { q.stream().collect::<String>().await }
//! });
//! assert!(producer.is_finished());
//! assert_eq!(Some("ABC".to_owned()), consumer.take_output());
//! ```
//!
//! When waking a task polls it right away, as [`task::start`](crate::task::start) does, a
//! task that both produces and consumes can observe its items in a different order than
//! it put them:
//!
//! ```
//! use local_synctools::sync::queue::Queue;
//! use local_synctools::task;
//! use std::{cell::RefCell, rc::Rc};
//!
//! let q = Queue::fifo(Some(1)).unwrap();
//! let consumed = Rc::new(RefCell::new(Vec::new()));
//! task::start({
//!     let (q, consumed) = (q.clone(), consumed.clone());
//!     async move {
//!         q.put('A').await.unwrap();
//!         q.put('B').await.unwrap();
//!         let item = q.get().await.unwrap();
//!         consumed.borrow_mut().push(item);
//!         q.put('C').await.unwrap();
//!         let item = q.get().await.unwrap();
//!         consumed.borrow_mut().push(item);
//!     }
//! });
//! task::start({
//!     let (q, consumed) = (q.clone(), consumed.clone());
//!     async move {
//!         let item = q.get().await.unwrap();
//!         consumed.borrow_mut().push(item);
//!     }
//! });
//! assert_eq!(vec!['B', 'C', 'A'], *consumed.borrow());
//! ```

mod ops;
mod order;

pub use ops::{Get, Items, Put};
pub use order::Order;
pub(crate) use order::{Discipline, Fifo, Lifo, SmallFirst};

use super::error::{GetError, InvalidArgument, PutError, TryGetError, TryPutError};
use super::waiter::{Entry, Waiter};
use crate::sealed::{Buffer, Registry};
use std::cell::Cell;
use std::fmt;
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::rc::Rc;

/// Lifecycle of a [`Queue`]. States only ever move forward.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum QueueState {
    /// All operations are allowed.
    Opened,
    /// Putting is not allowed. Getting is allowed until the buffer runs dry.
    HalfClosed,
    /// Nothing is allowed and the buffer is empty.
    Closed,
}

type Producers<T> = Registry<Entry<Result<(), PutError<T>>, T>>;
type Consumers<T> = Registry<Entry<Result<T, GetError>>>;

struct State<T> {
    buffer: Buffer<T>,
    producers: Producers<T>,
    consumers: Consumers<T>,
    state: Cell<QueueState>,
    transferring: Cell<bool>,
    capacity: Option<NonZeroUsize>,
    order: Order,
}

/// Multi-producer multi-consumer queue. Cloning yields another handle to the same queue.
pub struct Queue<T>(Rc<State<T>>);

impl<T: Ord + 'static> Queue<T> {
    /// Creates a queue holding at most `capacity` items (unbounded if `None`).
    pub fn new(capacity: Option<usize>, order: Order) -> Result<Self, InvalidArgument> {
        Self::with_discipline(capacity, order, || match order {
            Order::Fifo => Box::new(Fifo::default()),
            Order::Lifo => Box::new(Lifo::default()),
            Order::SmallFirst => Box::new(SmallFirst::default()),
        })
    }
}

impl<T: 'static> Queue<T> {
    /// First-in-first-out queue for items without an ordering.
    pub fn fifo(capacity: Option<usize>) -> Result<Self, InvalidArgument> {
        Self::with_discipline(capacity, Order::Fifo, || Box::new(Fifo::default()))
    }

    /// Last-in-first-out queue for items without an ordering.
    pub fn lifo(capacity: Option<usize>) -> Result<Self, InvalidArgument> {
        Self::with_discipline(capacity, Order::Lifo, || Box::new(Lifo::default()))
    }

    fn with_discipline(
        capacity: Option<usize>,
        order: Order,
        make_discipline: impl FnOnce() -> Box<dyn Discipline<T>>,
    ) -> Result<Self, InvalidArgument> {
        let capacity = match capacity {
            None => None,
            Some(n) => Some(NonZeroUsize::new(n).ok_or(InvalidArgument::ZeroCapacity)?),
        };
        // a single slot can't reorder anything
        let discipline: Box<dyn Discipline<T>> = if capacity.is_some_and(|c| c.get() == 1) {
            Box::new(Lifo::default())
        } else {
            make_discipline()
        };
        Ok(Self(Rc::new(State {
            buffer: Buffer::new(discipline),
            producers: Registry::new(),
            consumers: Registry::new(),
            state: Cell::new(QueueState::Opened),
            transferring: Cell::new(false),
            capacity,
            order,
        })))
    }
}

impl<T> Queue<T> {
    /// Takes an item, waiting for one if the buffer is empty.
    /// Fails once the queue is closed, or half-closed and drained.
    pub fn get(&self) -> Get<'_, T> {
        Get::new(&self.0)
    }

    /// Takes an item if one is buffered.
    pub fn get_nowait(&self) -> Result<T, TryGetError> {
        self.0.try_get()
    }

    /// Adds an item, waiting for free capacity if the buffer is full.
    /// Fails if the queue is (half-)closed before the item is accepted.
    pub fn put(&self, item: T) -> Put<'_, T> {
        Put::new(&self.0, item)
    }

    /// Adds an item if there is free capacity.
    pub fn put_nowait(&self, item: T) -> Result<(), TryPutError<T>> {
        self.0.try_put(item)
    }

    /// Disallows putting. Pending producers fail immediately, pending consumers keep being
    /// served until the buffer runs dry.
    pub fn half_close(&self) {
        self.0.half_close()
    }

    /// Disallows putting and getting, discards all buffered items and fails every pending call.
    pub fn close(&self) {
        self.0.close()
    }

    /// Yields items until the queue gets closed, or half-closed and drained.
    pub fn stream(&self) -> Items<'_, T> {
        Items::new(self)
    }

    pub fn len(&self) -> usize {
        self.0.buffer.len()
    }

    /// Same as [`Queue::len`].
    pub fn size(&self) -> usize {
        self.len()
    }

    /// `None` if unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.0.capacity.map(NonZeroUsize::get)
    }

    pub fn is_empty(&self) -> bool {
        self.0.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.0.is_full()
    }

    /// The order requested at construction.
    pub fn order(&self) -> Order {
        self.0.order
    }

    pub fn state(&self) -> QueueState {
        self.0.state.get()
    }
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("state", &self.0.state.get())
            .field("capacity", &self.0.capacity)
            .field("order", &self.0.order)
            .field("buffer", &self.0.buffer)
            .field("producers", &self.0.producers)
            .field("consumers", &self.0.consumers)
            .finish()
    }
}

struct TransferGuard<'a>(&'a Cell<bool>);

impl<'a> TransferGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        debug_assert!(!flag.get(), "nested transfer pass");
        flag.set(true);
        Self(flag)
    }
}

impl Drop for TransferGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T> State<T> {
    fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.buffer.len() >= capacity.get())
    }

    fn check_get(&self) -> Result<(), GetError> {
        match self.state.get() {
            QueueState::Closed => Err(GetError::Closed),
            QueueState::HalfClosed if self.buffer.is_empty() => Err(GetError::Closed),
            _ => Ok(()),
        }
    }

    fn fast_get(&self) -> ControlFlow<Result<T, GetError>> {
        if let Err(e) = self.check_get() {
            return ControlFlow::Break(Err(e));
        }
        if self.transferring.get() {
            return ControlFlow::Continue(());
        }
        match self.buffer.pop() {
            Some(item) => {
                self.after_pop();
                ControlFlow::Break(Ok(item))
            }
            None => ControlFlow::Continue(()),
        }
    }

    fn try_get(&self) -> Result<T, TryGetError> {
        self.check_get()?;
        let item = self.buffer.pop().ok_or(TryGetError::WouldBlock)?;
        self.after_pop();
        Ok(item)
    }

    fn after_pop(&self) {
        if !self.transferring.get() && !self.producers.is_empty() {
            self.transfer();
        }
    }

    fn fast_put(&self, item: T) -> ControlFlow<Result<(), PutError<T>>, T> {
        if self.state.get() != QueueState::Opened {
            return ControlFlow::Break(Err(PutError::Closed(item)));
        }
        if self.transferring.get() || self.is_full() {
            return ControlFlow::Continue(item);
        }
        self.buffer.push(item);
        self.after_push();
        ControlFlow::Break(Ok(()))
    }

    fn try_put(&self, item: T) -> Result<(), TryPutError<T>> {
        if self.state.get() != QueueState::Opened {
            return Err(TryPutError::Closed(item));
        }
        if self.is_full() {
            return Err(TryPutError::WouldBlock(item));
        }
        self.buffer.push(item);
        self.after_push();
        Ok(())
    }

    fn after_push(&self) {
        if !self.transferring.get() && !self.consumers.is_empty() {
            self.transfer();
        }
    }

    fn half_close(&self) {
        if self.state.get() != QueueState::Opened {
            return;
        }
        self.state.set(QueueState::HalfClosed);
        let producers = self.fail_producers();
        let consumers = if self.buffer.is_empty() {
            self.fail_consumers()
        } else {
            0
        };
        log::debug!(
            "queue half-closed with {} items left, failed {producers} producers and {consumers} consumers",
            self.buffer.len()
        );
    }

    fn close(&self) {
        if self.state.get() == QueueState::Closed {
            return;
        }
        self.state.set(QueueState::Closed);
        let discarded = self.buffer.len();
        self.buffer.clear();
        let producers = self.fail_producers();
        let consumers = self.fail_consumers();
        log::debug!(
            "queue closed, discarded {discarded} items, failed {producers} producers and {consumers} consumers"
        );
    }

    /// Takes back an item that was handed to a consumer which went away before receiving it.
    /// If the buffer is full the item waits in line like a suspended producer.
    fn restore(&self, item: T) {
        if self.state.get() == QueueState::Closed {
            log::debug!("item of an abandoned consumer discarded, queue is closed");
        } else if !self.is_full() {
            log::trace!("item of an abandoned consumer returned to the buffer");
            self.buffer.push(item);
            self.after_push();
        } else {
            log::trace!("item of an abandoned consumer queued behind the producers");
            self.producers.push(Entry {
                waiter: Waiter::detached(),
                payload: item,
            });
        }
    }

    fn fail_producers(&self) -> usize {
        let mut kept = Vec::new();
        let mut count = 0;
        while let Some(Entry { waiter, payload }) = self.producers.pop_live() {
            // items taken back from consumers were already accepted, they stay gettable
            if waiter.is_detached() && self.state.get() == QueueState::HalfClosed {
                kept.push(payload);
            } else {
                waiter.resume(Err(PutError::Closed(payload)));
                count += 1;
            }
        }
        for payload in kept {
            self.producers.push(Entry {
                waiter: Waiter::detached(),
                payload,
            });
        }
        count
    }

    fn fail_consumers(&self) -> usize {
        let mut count = 0;
        while let Some(Entry { waiter, .. }) = self.consumers.pop_live() {
            waiter.resume(Err(GetError::Closed));
            count += 1;
        }
        count
    }

    /// Alternately drains producers into the buffer and the buffer into consumers, until one
    /// side runs out or the buffer hits a capacity boundary. Resumed tasks may run, and call
    /// back into the queue, before the next iteration.
    fn transfer(&self) {
        let (mut accepted, mut delivered) = (0usize, 0usize);
        {
            let _guard = TransferGuard::enter(&self.transferring);
            loop {
                while !self.is_full() && !self.producers.is_empty() {
                    let Some(Entry { waiter, payload }) = self.producers.pop_live() else {
                        break;
                    };
                    self.buffer.push(payload);
                    accepted += 1;
                    waiter.resume(Ok(()));
                }
                if self.consumers.is_empty() || self.buffer.is_empty() {
                    break;
                }
                while !self.buffer.is_empty() && !self.consumers.is_empty() {
                    let Some(item) = self.buffer.pop() else {
                        break;
                    };
                    let Some(Entry { waiter, .. }) = self.consumers.pop_live() else {
                        log::error!("consumer registry reported a live entry but had none");
                        self.buffer.push(item);
                        break;
                    };
                    delivered += 1;
                    waiter.resume(Ok(item));
                }
                if self.producers.is_empty() || self.is_full() {
                    break;
                }
            }
        }
        log::trace!("transfer pass accepted {accepted} and delivered {delivered} items");

        if self.state.get() == QueueState::HalfClosed && self.buffer.is_empty() {
            let stranded = self.fail_consumers();
            if stranded > 0 {
                log::debug!("queue drained after half-close, failed {stranded} consumers");
            }
        }
    }
}
